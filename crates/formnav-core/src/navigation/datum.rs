use crate::error::{NavigationError, Result};
use crate::expression::ExpressionParser;
use crate::frame::{CommitTarget, Datum, FORM_ID_PLACEHOLDER, FORM_ID_SENTINEL_KEY, SessionFrame};

/// Evaluates the computed datum the frame is waiting on and commits the result.
///
/// A form-id datum sets the target form namespace and commits a placeholder;
/// any other computed datum commits its stringified value. Parse and
/// evaluation failures mean the app definition is broken and are fatal.
pub fn compute_datum(frame: &mut dyn SessionFrame, parser: &dyn ExpressionParser) -> Result<()> {
    let datum = frame
        .needed_datum()
        .ok_or_else(|| NavigationError::protocol("computed datum requested but none is needed"))?;
    let computed = datum.as_computed().ok_or_else(|| {
        NavigationError::protocol(format!(
            "datum '{}' is not a computed datum",
            datum.data_id()
        ))
    })?;

    let expression = parser
        .parse(&computed.value)
        .map_err(|detail| NavigationError::expression(&computed.value, detail))?;

    let value = {
        let context = frame.evaluation_context();
        context
            .evaluate(expression.as_ref())
            .map_err(|detail| NavigationError::expression(expression.source(), detail))?
    }
    .to_string();

    tracing::debug!(datum = %computed.data_id, %value, "computed datum");

    match datum {
        Datum::FormId(_) => {
            frame.set_target_form_namespace(value);
            frame.commit(
                CommitTarget::Sentinel(FORM_ID_SENTINEL_KEY),
                FORM_ID_PLACEHOLDER.to_string(),
            );
        }
        other => frame.commit(CommitTarget::Datum(other), value),
    }
    Ok(())
}
