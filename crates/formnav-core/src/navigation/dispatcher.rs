use super::{NavigationEnv, resolve};
use crate::error::{NavigationError, Result};
use crate::screen::{
    ACTION_PREFIX, EntityScreenContext, Screen, ScreenError, USE_SELECTED_VALUES,
};
use crate::session::SessionState;

/// Flags controlling how one input is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputOptions {
    pub needs_full_entity_screen: bool,
    /// The caller already knows the input is valid for the current screen.
    pub input_validated: bool,
    pub allow_auto_launch: bool,
    pub respect_relevancy: bool,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            needs_full_entity_screen: true,
            input_validated: false,
            allow_auto_launch: false,
            respect_relevancy: true,
        }
    }
}

/// Applies `input` to `screen`, resolving one first when none is given.
///
/// Returns `Ok(false)` when there was no screen to apply it to, i.e. the
/// session is ready for form entry.
pub fn handle_input(
    state: &mut SessionState,
    env: &NavigationEnv,
    screen: Option<Screen>,
    input: &str,
    options: InputOptions,
    context: &EntityScreenContext,
) -> Result<bool> {
    let mut screen = screen;
    let mut needs_full_entity_screen = options.needs_full_entity_screen;
    let mut input_validated = options.input_validated;

    loop {
        let mut current = match screen.take() {
            Some(current) => current,
            None => match resolve(state, env, needs_full_entity_screen, context)? {
                Some(resolved) => resolved,
                None => return Ok(false),
            },
        };

        tracing::info!("Screen {} handling input {}", current, input);

        let outcome = apply(
            state,
            &mut current,
            input,
            input_validated,
            options,
            context,
        )
        .map_err(|err| input_failure(&current, input, err))?;

        match outcome {
            Applied::Reresolve => {
                // The screen auto-selected and moved the frame on.
                tracing::debug!(screen = %current, "auto-selected entities, re-resolving");
                needs_full_entity_screen = true;
                // Only an action token reaches here validated, and the prefix
                // alone sends it through init on the next screen.
                input_validated = false;
            }
            Applied::Done { auto_launched } => {
                if current.kind() == crate::screen::ScreenKind::MultiSelectEntity
                    && input == USE_SELECTED_VALUES
                {
                    let reference = current.storage_reference_id().ok_or_else(|| {
                        input_failure(
                            &current,
                            input,
                            ScreenError::MissingValue(
                                "no stored selection to reference".to_string(),
                            ),
                        )
                    })?;
                    state.history.add_selection(reference);
                }

                if !auto_launched {
                    let breadcrumb = current.breadcrumb(input, state.frame.as_ref());
                    state.history.push_breadcrumb(breadcrumb);
                }
                return Ok(true);
            }
        }
    }
}

enum Applied {
    Reresolve,
    Done { auto_launched: bool },
}

fn apply(
    state: &mut SessionState,
    screen: &mut Screen,
    input: &str,
    input_validated: bool,
    options: InputOptions,
    context: &EntityScreenContext,
) -> std::result::Result<Applied, ScreenError> {
    let frame = state.frame.as_mut();

    let Some(has_auto_launch) = screen.has_auto_launch_action() else {
        screen.handle_input_and_update_session(
            frame,
            input,
            options.allow_auto_launch,
            context.selected_values(),
            options.respect_relevancy,
        )?;
        return Ok(Applied::Done {
            auto_launched: false,
        });
    };

    let auto_launch = has_auto_launch && options.allow_auto_launch;
    if input.starts_with(ACTION_PREFIX) || auto_launch || !input_validated {
        screen.init(frame)?;
        if screen.should_be_skipped() && !auto_launch && screen.auto_select_entities(frame)? {
            return Ok(Applied::Reresolve);
        }
        screen.handle_input_and_update_session(
            frame,
            input,
            options.allow_auto_launch,
            context.selected_values(),
            options.respect_relevancy,
        )?;
    } else {
        screen.update_datum(frame, input)?;
    }
    Ok(Applied::Done {
        auto_launched: auto_launch,
    })
}

fn input_failure(screen: &Screen, input: &str, err: ScreenError) -> NavigationError {
    match err {
        ScreenError::IndexOutOfBounds { .. } | ScreenError::MissingValue(_) => {
            tracing::warn!(%screen, input, error = %err, "input could not be applied");
            NavigationError::InputHandling {
                screen: screen.to_string(),
                input: input.to_string(),
                detail: err.to_string(),
            }
        }
        ScreenError::Session(message) => NavigationError::screen(message),
    }
}
