//! Letter rendering: one request in, one complete HTML document out

use super::templates;
use crate::db::LetterSource;
use crate::error::{LetterError, Result};
use letter_types::{LetterRequest, RunContext, ScheduleTable};

/// A request paired with its finished HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    request: LetterRequest,
    html: String,
}

impl RenderedDocument {
    pub(crate) fn from_parts(request: LetterRequest, html: String) -> Self {
        Self { request, html }
    }

    pub fn request(&self) -> &LetterRequest {
        &self.request
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

pub struct LetterRenderer {
    context: RunContext,
}

impl LetterRenderer {
    pub fn new(context: RunContext) -> Self {
        Self { context }
    }

    /// Render one letter. Change letters look up the property's schedule
    /// first, one query per letter.
    pub async fn render(
        &self,
        source: &dyn LetterSource,
        request: LetterRequest,
    ) -> Result<RenderedDocument> {
        let schedule = match &request {
            LetterRequest::CollectionChange { property, .. } => {
                Some(source.fetch_schedule(property).await?)
            }
            _ => None,
        };

        let html = compose(&request, &self.context.letter_date(), schedule.as_ref())?;
        log::debug!("Rendered {} letter for {}", request.kind(), request.key());

        Ok(RenderedDocument::from_parts(request, html))
    }
}

/// Fill the template for `request`
pub fn compose(
    request: &LetterRequest,
    letter_date: &str,
    schedule: Option<&ScheduleTable>,
) -> Result<String> {
    let (template, address) = match request {
        LetterRequest::GardenWaste { address, .. } => {
            (templates::GARDEN_WASTE, escape_html(address))
        }
        LetterRequest::Recycling { address, .. } => (templates::RECYCLING, escape_html(address)),
        LetterRequest::CollectionChange { address, .. } => {
            (templates::COLLECTION_CHANGE, format_change_address(address))
        }
    };

    let table = match request {
        LetterRequest::CollectionChange { property, .. } => Some(schedule_table(
            schedule.ok_or_else(|| LetterError::MissingSchedule(property.to_string()))?,
        )),
        _ => None,
    };

    let occupier = escape_html(request.occupier());
    let date = escape_html(letter_date);
    let reference = escape_html(request.key().as_str());
    let mut values = vec![
        (templates::OCCUPIER, occupier.as_str()),
        (templates::ADDRESS, address.as_str()),
        (templates::DATE, date.as_str()),
        (templates::REFERENCE, reference.as_str()),
    ];
    if let Some(table) = &table {
        values.push((templates::SCHEDULE, table.as_str()));
    }

    Ok(templates::fill(template, &values))
}

/// One address part per line: `12 High St, Northallerton` becomes
/// `12 High St<br>\nNorthallerton`
pub fn format_change_address(address: &str) -> String {
    address
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(escape_html)
        .collect::<Vec<_>>()
        .join("<br>\n")
}

fn schedule_table(schedule: &ScheduleTable) -> String {
    let mut table = String::from("<table class=\"schedule\">\n");
    for (heading, value) in schedule.entries() {
        table.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>\n",
            escape_html(&heading.replace('_', " ")),
            escape_html(value)
        ));
    }
    table.push_str("</table>");
    table
}

/// Escape special characters for HTML text
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
