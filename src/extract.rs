//! Field extraction from an offer detail page.
//!
//! Each field is an independent [`Field`] that reads one value from the
//! parsed page. [`OfferExtractor::extract`] attempts every field and keeps
//! whatever succeeded: a missing or broken field leaves that attribute
//! empty and never affects the others.

use anyhow::{anyhow, bail, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use job_atlas_core::models::{operating_mode, ContractType, Offer, Salaries};
use job_atlas_core::salary;
use job_atlas_core::sanitize::{collapse_whitespace, sanitize};
use job_atlas_core::tech_stack::TechStack;

use crate::config::SelectorConfig;

/// One independently fallible accessor.
trait Field {
    type Output;

    fn name(&self) -> &'static str;

    fn read(&self, doc: &Html) -> Result<Self::Output>;
}

fn compile(field: &str, css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector for {field} ({css}): {e:?}"))
}

/// Visible text with whitespace collapsed to single spaces.
fn inline_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Text nodes, trimmed, one per line. Keeps the line structure salary
/// blocks rely on.
fn block_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn has_class_fragment(el: &ElementRef<'_>, fragment: &str) -> bool {
    fragment.is_empty()
        || el
            .value()
            .attr("class")
            .is_some_and(|c| c.contains(fragment))
}

/// First element matching a locator, as text.
struct TextField {
    name: &'static str,
    selector: Selector,
}

impl TextField {
    fn new(name: &'static str, css: &str) -> Result<Self> {
        Ok(Self {
            name,
            selector: compile(name, css)?,
        })
    }
}

impl Field for TextField {
    type Output = Option<String>;

    fn name(&self) -> &'static str {
        self.name
    }

    fn read(&self, doc: &Html) -> Result<Option<String>> {
        Ok(doc.select(&self.selector).next().map(inline_text))
    }
}

/// Salary blocks below the "Salary" heading.
struct SalaryField {
    span: Selector,
    heading: String,
    container_class: String,
    block: Selector,
}

impl Field for SalaryField {
    type Output = Salaries;

    fn name(&self) -> &'static str {
        "salary"
    }

    fn read(&self, doc: &Html) -> Result<Salaries> {
        let mut salaries = Salaries::default();

        let Some(heading) = doc
            .select(&self.span)
            .find(|s| inline_text(*s).contains(&self.heading))
        else {
            return Ok(salaries);
        };

        let Some(container) = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "div" && has_class_fragment(el, &self.container_class))
        else {
            bail!("salary heading has no sibling container");
        };

        for block in container.select(&self.block) {
            let text = block_text(block);
            let lines = salary::parse_block(&text);
            if lines.is_empty() {
                debug!(block = %text, "salary block matched no pattern");
            }
            // Later blocks overwrite earlier ones for the same slot
            for line in lines {
                if line.via_fallback {
                    debug!(slot = line.slot.label(), value = %line.value, "salary inferred from amount range");
                }
                salaries.set(line.slot, line.value);
            }
        }
        Ok(salaries)
    }
}

/// Skill/level pairs.
struct TechStackField {
    name: Selector,
    level: Selector,
    container: Selector,
    container_limit: usize,
}

impl Field for TechStackField {
    type Output = TechStack;

    fn name(&self) -> &'static str {
        "tech_stack"
    }

    fn read(&self, doc: &Html) -> Result<TechStack> {
        let mut stack = TechStack::new();

        // Heading per skill, level in a span under the heading's parent
        for heading in doc.select(&self.name) {
            let name = inline_text(heading);
            let level = heading
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|p| p.select(&self.level).next())
                .map(inline_text)
                .unwrap_or_default();
            if !name.is_empty() && !level.is_empty() {
                stack.insert(&name, &level);
            }
        }
        if !stack.is_empty() {
            return Ok(stack);
        }

        // Loose scan of the first few containers
        for container in doc.select(&self.container).take(self.container_limit) {
            let name = container.select(&self.name).next().map(inline_text);
            let level = container.select(&self.level).next().map(inline_text);
            if let (Some(name), Some(level)) = (name, level) {
                if !name.is_empty() && !level.is_empty() {
                    stack.insert_bounded(&name, &level);
                }
            }
        }
        Ok(stack)
    }
}

/// Run one field, logging and discarding its error.
fn attempt<F: Field>(url: &str, field: &F, doc: &Html) -> Option<F::Output> {
    match field.read(doc) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(url, field = field.name(), "field extraction failed: {e:#}");
            None
        }
    }
}

/// Builds an [`Offer`] from a detail-page snapshot.
pub struct OfferExtractor {
    title: TextField,
    category: TextField,
    company: TextField,
    location: TextField,
    work_type: TextField,
    experience: TextField,
    employment_type: TextField,
    salary: SalaryField,
    tech_stack: TechStackField,
    max_field_length: Option<usize>,
}

impl OfferExtractor {
    /// Compile all locators. Fails only on a malformed selector.
    pub fn new(selectors: &SelectorConfig, max_field_length: Option<usize>) -> Result<Self> {
        let block_css = if selectors.salary_block_class.is_empty() {
            "div".to_string()
        } else {
            format!("div[class*=\"{}\"]", selectors.salary_block_class)
        };

        Ok(Self {
            title: TextField::new("title", &selectors.title)?,
            category: TextField::new("category", &selectors.category)?,
            company: TextField::new("company", &selectors.company)?,
            location: TextField::new("location", &selectors.location)?,
            work_type: TextField::new("work_type", &selectors.work_type)?,
            experience: TextField::new("experience", &selectors.experience)?,
            employment_type: TextField::new("employment_type", &selectors.employment_type)?,
            salary: SalaryField {
                span: compile("salary", "span")?,
                heading: selectors.salary_heading.clone(),
                container_class: selectors.salary_container_class.clone(),
                block: compile("salary", &block_css)?,
            },
            tech_stack: TechStackField {
                name: compile("tech_stack", &selectors.tech_name)?,
                level: compile("tech_stack", &selectors.tech_level)?,
                container: compile("tech_stack", &selectors.tech_container)?,
                container_limit: selectors.tech_container_limit,
            },
            max_field_length,
        })
    }

    /// Extract every field of the page at `url` from its `html`.
    pub fn extract(&self, url: &str, html: &str) -> Offer {
        let doc = Html::parse_document(html);
        let cap = self.max_field_length;
        let text = |field: &TextField| sanitize(attempt(url, field, &doc).flatten().as_deref(), cap);

        let mut offer = Offer::new(url);
        offer.title = text(&self.title);
        offer.category = text(&self.category);
        offer.company = text(&self.company);
        offer.location = text(&self.location);
        offer.work_type = text(&self.work_type);
        offer.experience = text(&self.experience);
        offer.employment_type = text(&self.employment_type);
        offer.operating_mode = operating_mode(offer.location.as_deref());

        if let Some(raw) = attempt(url, &self.salary, &doc) {
            for (slot, value) in raw.filled() {
                if let Some(v) = sanitize(Some(value), cap) {
                    offer.salaries.set(slot, v);
                }
            }
        }

        offer.tech_stack = attempt(url, &self.tech_stack, &doc)
            .and_then(|stack| stack.serialize())
            .and_then(|blob| sanitize(Some(&blob), None));

        debug!(
            url,
            title = offer.title.as_deref().unwrap_or("-"),
            salaries = offer.salaries.filled().len(),
            b2b = offer.salaries.get(ContractType::B2b).is_some(),
            "offer extracted"
        );
        offer
    }
}
