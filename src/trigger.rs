//! Fire-and-forget invocation of the downstream normalization function.
//!
//! After a scrape the Lambda named by `[trigger] function_name` is invoked
//! with `X-Amz-Invocation-Type: Event`, so the call returns as soon as AWS
//! has queued it. The scrape never fails because of this step.

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use url::Url;

use crate::aws::{uri_encode, AwsCredentials, SigV4};
use crate::config::{Config, TriggerConfig};

/// Event body sent downstream: run every stage without clearing.
const FULL_RUN_EVENT: &str = r#"{"stage":"all","clear_first":false}"#;

/// Invoke the configured function, logging the outcome.
///
/// No-op when no function is configured.
pub async fn invoke_downstream(config: &Config) {
    let Some(function) = config.trigger.function_name.as_deref() else {
        info!("no downstream function configured, skipping trigger");
        return;
    };

    let result = match AwsCredentials::from_env() {
        Ok(creds) => invoke_async(&config.trigger, function, &creds).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(status) => info!(function, status, "downstream normalization triggered"),
        Err(e) => warn!(function, "failed to trigger downstream normalization: {e:#}"),
    }
}

/// Send one asynchronous `Invoke` and return the HTTP status.
pub async fn invoke_async(
    trigger: &TriggerConfig,
    function: &str,
    credentials: &AwsCredentials,
) -> Result<u16> {
    let region = trigger.region();
    let endpoint = match trigger.endpoint_url {
        Some(ref u) => u.clone(),
        None => format!("https://lambda.{region}.amazonaws.com"),
    };
    let endpoint =
        Url::parse(&endpoint).with_context(|| format!("invalid Lambda endpoint: {endpoint}"))?;
    let host = match (endpoint.host_str(), endpoint.port()) {
        (Some(h), Some(p)) => format!("{h}:{p}"),
        (Some(h), None) => h.to_string(),
        (None, _) => bail!("Lambda endpoint has no host: {endpoint}"),
    };

    let path = format!("/2015-03-31/functions/{}/invocations", uri_encode(function));
    let body = FULL_RUN_EVENT.as_bytes();
    let signer = SigV4 {
        credentials,
        region: &region,
        service: "lambda",
    };
    let signed = signer.sign(
        "POST",
        &host,
        &path,
        &[("x-amz-invocation-type", "Event")],
        body,
        chrono::Utc::now(),
    );

    let client = reqwest::Client::new();
    let mut req = client
        .post(format!("{}://{}{}", endpoint.scheme(), host, path))
        .header("x-amz-invocation-type", "Event")
        .header("content-type", "application/json");
    for (name, value) in signed {
        req = req.header(name, value);
    }

    let response = req
        .body(body.to_vec())
        .send()
        .await
        .context("Lambda invoke request failed")?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        bail!("Lambda invoke returned HTTP {}: {}", status, text);
    }
    Ok(status.as_u16())
}
