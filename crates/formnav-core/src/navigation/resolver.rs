use super::{NavigationEnv, compute_datum, screen_failure};
use crate::error::{NavigationError, Result};
use crate::frame::NeededDataKind;
use crate::screen::{EntityScreenContext, Screen};
use crate::session::{EntityScreenKey, SessionState};

/// Decides what the frame needs next and materialises it as a screen.
///
/// Returns `Ok(None)` when the frame is ready for form entry. View-only
/// commands are popped and computed datums are evaluated in place; both keep
/// the loop going instead of recursing, so arbitrarily long chains of them
/// use constant stack.
pub fn resolve(
    state: &mut SessionState,
    env: &NavigationEnv,
    needs_full_entity_screen: bool,
    context: &EntityScreenContext,
) -> Result<Option<Screen>> {
    loop {
        let kind = {
            let evaluation = state.frame.evaluation_context();
            state.frame.needed_data_kind(evaluation.as_ref())
        };
        tracing::debug!(%kind, "resolving next screen");

        match kind {
            NeededDataKind::None => {
                match state.frame.current_command() {
                    Some(command) if state.frame.is_view_command(&command) => {
                        tracing::debug!(%command, "stepping back from view command");
                        state.frame.step_back();
                    }
                    // Ready for form entry.
                    _ => return Ok(None),
                }
            }
            NeededDataKind::Command => {
                let mut screen = Screen::Menu(env.screens.menu());
                screen.init(state.frame.as_mut()).map_err(screen_failure)?;
                return Ok(Some(screen));
            }
            NeededDataKind::EntitySelection => {
                return entity_screen(state, env, needs_full_entity_screen, context).map(Some);
            }
            NeededDataKind::DatumComputed => {
                compute_datum(state.frame.as_mut(), env.expressions.as_ref())?;
            }
            NeededDataKind::QueryRequest => {
                let mut screen = Screen::Query(env.screens.query(env.instance_storage.clone()));
                screen.init(state.frame.as_mut()).map_err(screen_failure)?;
                return Ok(Some(screen));
            }
            NeededDataKind::SyncRequest => {
                let mut screen = Screen::Sync(env.screens.sync(env.sync_as_user.clone()));
                screen.init(state.frame.as_mut()).map_err(screen_failure)?;
                return Ok(Some(screen));
            }
            NeededDataKind::Unknown(raw) => {
                return Err(NavigationError::protocol(format!(
                    "Unexpected Frame Request: {}",
                    raw
                )));
            }
        }
    }
}

/// Returns the cached screen for the needed datum, building and caching it on a miss.
fn entity_screen(
    state: &mut SessionState,
    env: &NavigationEnv,
    needs_full_entity_screen: bool,
    context: &EntityScreenContext,
) -> Result<Screen> {
    let datum = state.frame.needed_datum().ok_or_else(|| {
        NavigationError::protocol("entity selection requested but no datum is needed")
    })?;
    let entity = datum.as_entity().ok_or_else(|| {
        NavigationError::protocol(format!(
            "datum '{}' is not an entity datum",
            datum.data_id()
        ))
    })?;

    let key = EntityScreenKey::for_datum(entity);
    if let Some(cached) = state.entity_cache.get(&key) {
        tracing::debug!(datum = %key.datum_id, "entity screen cache hit");
        return Ok(cached);
    }

    let mut screen = if datum.is_multi_select() {
        Screen::MultiSelectEntity(
            env.screens
                .multi_select_entity(
                    entity,
                    needs_full_entity_screen,
                    env.instance_storage.clone(),
                    context,
                )
                .map_err(screen_failure)?,
        )
    } else {
        Screen::Entity(
            env.screens
                .entity(entity, needs_full_entity_screen, context)
                .map_err(screen_failure)?,
        )
    };
    screen.init(state.frame.as_mut()).map_err(screen_failure)?;
    state.entity_cache.insert(key, &screen);
    Ok(screen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedFrame, Step, TestHarness};

    #[test]
    fn test_view_command_pops_once_and_returns_none() {
        let frame = ScriptedFrame::new(vec![Step::view_command("m0"), Step::done()]);
        let probe = frame.probe();
        let mut harness = TestHarness::new(frame);

        let screen = harness.resolve().unwrap();

        assert!(screen.is_none());
        assert_eq!(probe.step_backs(), 1);
    }

    #[test]
    fn test_ready_for_form_entry_returns_none() {
        let mut harness = TestHarness::new(ScriptedFrame::new(vec![Step::done()]));
        assert!(harness.resolve().unwrap().is_none());
    }

    #[test]
    fn test_command_yields_initialised_menu() {
        let mut harness = TestHarness::new(ScriptedFrame::new(vec![Step::command("m1")]));
        let screen = harness.resolve().unwrap().unwrap();

        assert_eq!(screen.kind(), crate::screen::ScreenKind::Menu);
        assert_eq!(harness.screens.inits(), 1);
    }

    #[test]
    fn test_computed_chain_never_yields_a_screen() {
        let frame = ScriptedFrame::new(vec![
            Step::computed("a", "'1'"),
            Step::computed("b", "'2'"),
            Step::form_id("xmlns", "'http://example.org/form'"),
            Step::done(),
        ]);
        let probe = frame.probe();
        let mut harness = TestHarness::new(frame);

        assert!(harness.resolve().unwrap().is_none());
        assert_eq!(probe.commits(), 3);
        assert_eq!(
            harness.state.frame.target_form_namespace().as_deref(),
            Some("http://example.org/form")
        );
    }

    #[test]
    fn test_computed_chain_stops_at_first_real_screen() {
        let frame = ScriptedFrame::new(vec![
            Step::computed("a", "'1'"),
            Step::entity("case_id", "instance('casedb')/casedb/case"),
        ]);
        let mut harness = TestHarness::new(frame);

        let screen = harness.resolve().unwrap().unwrap();
        assert_eq!(screen.kind(), crate::screen::ScreenKind::Entity);
    }

    #[test]
    fn test_long_computed_chain_uses_constant_stack() {
        let mut steps: Vec<Step> = (0..10_000)
            .map(|i| Step::computed(&format!("d{i}"), "'x'"))
            .collect();
        steps.push(Step::done());
        let mut harness = TestHarness::new(ScriptedFrame::new(steps));

        assert!(harness.resolve().unwrap().is_none());
    }

    #[test]
    fn test_entity_selection_is_cached_per_datum_and_nodeset() {
        let mut harness = TestHarness::new(ScriptedFrame::new(vec![Step::entity(
            "case_id",
            "instance('casedb')/casedb/case",
        )]));

        let first = harness.resolve().unwrap().unwrap();
        let second = harness.resolve().unwrap().unwrap();

        assert!(first.same_instance(&second));
        assert_eq!(harness.screens.entity_constructions(), 1);
        assert_eq!(harness.state.entity_cache.len(), 1);
    }

    #[test]
    fn test_other_kinds_are_rebuilt_every_time() {
        let mut harness = TestHarness::new(ScriptedFrame::new(vec![Step::query()]));

        let first = harness.resolve().unwrap().unwrap();
        let second = harness.resolve().unwrap().unwrap();

        assert!(!first.same_instance(&second));
        assert_eq!(harness.screens.inits(), 2);
        assert!(harness.state.entity_cache.is_empty());
    }

    #[test]
    fn test_multi_select_datum_builds_multi_select_screen() {
        let mut harness = TestHarness::new(ScriptedFrame::new(vec![Step::multi_select(
            "selected_cases",
            "instance('casedb')/casedb/case[@case_type='patient']",
        )]));

        let screen = harness.resolve().unwrap().unwrap();
        assert_eq!(screen.kind(), crate::screen::ScreenKind::MultiSelectEntity);
    }

    #[test]
    fn test_sync_screen_receives_as_user() {
        let mut harness = TestHarness::new(ScriptedFrame::new(vec![Step::sync()]));
        harness.env.sync_as_user = Some("worker@demo.commcarehq.org".to_string());

        let screen = harness.resolve().unwrap().unwrap();
        assert_eq!(screen.kind(), crate::screen::ScreenKind::Sync);
        assert_eq!(
            harness.screens.last_sync_user().as_deref(),
            Some("worker@demo.commcarehq.org")
        );
    }

    #[test]
    fn test_unknown_kind_is_protocol_error() {
        let mut harness = TestHarness::new(ScriptedFrame::new(vec![Step::unknown("jump")]));
        let err = harness.resolve().unwrap_err();

        assert!(err.is_fatal());
        assert!(err.to_string().contains("jump"));
    }
}
