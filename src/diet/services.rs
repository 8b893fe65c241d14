use thiserror::Error;
use tracing::{info, warn};

use super::{
    dto::SubmitRequest,
    payload::{build_payload, parse_date, DietPayload},
    selection::SelectionEngine,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("No Food Selected")]
    NoFoodSelected,
    #[error("client_id is required")]
    MissingClientId,
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    /// Foods are selected, but none under a category the diet API knows.
    #[error("No Food Selected in a known meal category (got {})", .0.join(", "))]
    UnmappedCategories(Vec<String>),
}

/// Validate a submit request against the session's selection and build the payload.
pub fn submit_selection(
    engine: &SelectionEngine,
    request: &SubmitRequest,
) -> Result<DietPayload, SubmitError> {
    let client_id = request.client_id.trim();
    if client_id.is_empty() {
        return Err(SubmitError::MissingClientId);
    }

    let date = parse_date(&request.date).map_err(|e| {
        warn!(error = %e, date = %request.date, "submit with invalid date");
        SubmitError::InvalidDate(request.date.clone())
    })?;

    if !engine.has_selection() {
        warn!(%client_id, "submit with empty selection");
        return Err(SubmitError::NoFoodSelected);
    }

    let gym_id = request
        .gym_id
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_owned);

    let selection = engine.selection_set();
    let payload = build_payload(&selection, date, client_id, gym_id);
    if payload.diet_data.is_empty() {
        let mut unmapped: Vec<String> = selection
            .iter()
            .filter_map(|s| s.category_id.clone())
            .collect();
        unmapped.dedup();
        warn!(%client_id, categories = ?unmapped, "selection has no canonical category");
        return Err(SubmitError::UnmappedCategories(unmapped));
    }

    info!(
        %client_id,
        date = %request.date,
        categories = payload.diet_data.len(),
        "diet submission prepared"
    );
    Ok(payload)
}
