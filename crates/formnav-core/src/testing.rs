//! Scripted in-memory collaborators for tests.
//!
//! [`ScriptedFrame`] walks a fixed list of [`Step`]s instead of running a real
//! suite grammar; every commit, menu choice or view-command pop moves it one
//! step forward. The fake screens record what happened to them in a log shared
//! with the [`FakeScreenFactory`] that built them.

use crate::app::{Endpoint, InstalledApp};
use crate::error::{NavigationError, Result};
use crate::expression::{EvaluationContext, Expression, ExpressionParser, Value};
use crate::frame::{
    CommandId, CommitTarget, ComputedDatum, Datum, EntityDatum, FrameFactory, FrameSnapshot,
    NeededDataKind, SessionFrame,
};
use crate::instance::{VirtualInstance, VirtualInstanceStorage, store_selected_values};
use crate::navigation::{self, InputOptions, NavigationEnv};
use crate::screen::{
    ACTION_PREFIX, EntityScreen, EntityScreenContext, MenuScreen, MultiSelectEntityScreen, Screen,
    ScreenBehavior, ScreenError, ScreenFactory, ScreenResult, SharedEntityScreen,
    SharedMultiSelectScreen, USE_SELECTED_VALUES,
};
use crate::session::{SessionSerializer, SessionServices, SessionState};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

pub const TEST_APP_TITLE: &str = "Test App";

/// Number of choices every fake menu offers.
pub const MENU_CHOICES: usize = 3;

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One scripted frame state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Command { id: String },
    ViewCommand { id: String },
    Datum { datum: Datum },
    Query,
    Sync,
    Unknown { raw: String },
    Done,
}

impl Step {
    pub fn command(id: &str) -> Self {
        Step::Command { id: id.to_string() }
    }

    pub fn view_command(id: &str) -> Self {
        Step::ViewCommand { id: id.to_string() }
    }

    pub fn entity(id: &str, nodeset: &str) -> Self {
        Step::Datum {
            datum: Datum::Entity(EntityDatum {
                data_id: id.to_string(),
                nodeset: nodeset.to_string(),
            }),
        }
    }

    pub fn multi_select(id: &str, nodeset: &str) -> Self {
        Step::Datum {
            datum: Datum::MultiSelectEntity(EntityDatum {
                data_id: id.to_string(),
                nodeset: nodeset.to_string(),
            }),
        }
    }

    pub fn computed(id: &str, expression: &str) -> Self {
        Step::Datum {
            datum: Datum::Computed(ComputedDatum {
                data_id: id.to_string(),
                value: expression.to_string(),
            }),
        }
    }

    pub fn form_id(id: &str, expression: &str) -> Self {
        Step::Datum {
            datum: Datum::FormId(ComputedDatum {
                data_id: id.to_string(),
                value: expression.to_string(),
            }),
        }
    }

    pub fn query() -> Self {
        Step::Query
    }

    pub fn sync() -> Self {
        Step::Sync
    }

    pub fn unknown(raw: &str) -> Self {
        Step::Unknown {
            raw: raw.to_string(),
        }
    }

    pub fn done() -> Self {
        Step::Done
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Script {
    steps: Vec<Step>,
    cursor: usize,
    command: Option<CommandId>,
    data: Vec<(String, String)>,
    target_form_namespace: Option<String>,
}

#[derive(Debug, Default)]
struct ProbeCounts {
    step_backs: Cell<usize>,
    commits: Cell<usize>,
}

/// Counters observed on a [`ScriptedFrame`] after it was moved into a session.
#[derive(Debug, Clone, Default)]
pub struct FrameProbe {
    counts: Rc<ProbeCounts>,
}

impl FrameProbe {
    pub fn step_backs(&self) -> usize {
        self.counts.step_backs.get()
    }

    pub fn commits(&self) -> usize {
        self.counts.commits.get()
    }
}

/// A frame that replays a fixed script. Running past the end reads as [`Step::Done`].
#[derive(Debug)]
pub struct ScriptedFrame {
    script: Script,
    probe: FrameProbe,
}

impl ScriptedFrame {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Script {
                steps,
                cursor: 0,
                command: None,
                data: Vec::new(),
                target_form_namespace: None,
            },
            probe: FrameProbe::default(),
        }
    }

    pub fn probe(&self) -> FrameProbe {
        self.probe.clone()
    }

    fn current(&self) -> Option<&Step> {
        self.script.steps.get(self.script.cursor)
    }

    fn advance(&mut self) {
        self.script.cursor += 1;
    }
}

impl SessionFrame for ScriptedFrame {
    fn needed_data_kind(&self, _context: &dyn EvaluationContext) -> NeededDataKind {
        match self.current() {
            None | Some(Step::Done) | Some(Step::ViewCommand { .. }) => NeededDataKind::None,
            Some(Step::Command { .. }) => NeededDataKind::Command,
            Some(Step::Datum { datum }) => match datum {
                Datum::Entity(_) | Datum::MultiSelectEntity(_) => NeededDataKind::EntitySelection,
                Datum::FormId(_) | Datum::Computed(_) => NeededDataKind::DatumComputed,
            },
            Some(Step::Query) => NeededDataKind::QueryRequest,
            Some(Step::Sync) => NeededDataKind::SyncRequest,
            Some(Step::Unknown { raw }) => NeededDataKind::Unknown(raw.clone()),
        }
    }

    fn needed_datum(&self) -> Option<Datum> {
        match self.current() {
            Some(Step::Datum { datum }) => Some(datum.clone()),
            _ => None,
        }
    }

    fn current_command(&self) -> Option<CommandId> {
        match self.current() {
            Some(Step::ViewCommand { id }) => Some(id.clone()),
            _ => self.script.command.clone(),
        }
    }

    fn is_view_command(&self, command: &str) -> bool {
        matches!(self.current(), Some(Step::ViewCommand { id }) if id == command)
    }

    fn step_back(&mut self) {
        let counts = &self.probe.counts;
        counts.step_backs.set(counts.step_backs.get() + 1);
        self.advance();
    }

    fn set_command(&mut self, command: CommandId) {
        if matches!(self.current(), Some(Step::Command { .. })) {
            self.advance();
        }
        self.script.command = Some(command);
    }

    fn evaluation_context(&self) -> Box<dyn EvaluationContext + '_> {
        Box::new(FakeEvaluationContext {
            data: &self.script.data,
        })
    }

    fn commit(&mut self, target: CommitTarget, value: String) {
        let counts = &self.probe.counts;
        counts.commits.set(counts.commits.get() + 1);
        let key = match target {
            CommitTarget::Datum(datum) => datum.data_id().to_string(),
            CommitTarget::Sentinel(key) => key.to_string(),
        };
        self.script.data.push((key, value));
        self.advance();
    }

    fn set_target_form_namespace(&mut self, namespace: String) {
        self.script.target_form_namespace = Some(namespace);
    }

    fn target_form_namespace(&self) -> Option<String> {
        self.script.target_form_namespace.clone()
    }

    fn session_data(&self) -> Vec<(String, String)> {
        self.script.data.clone()
    }

    fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot(serde_json::to_value(&self.script).expect("script is plain data"))
    }
}

/// Hands out fresh copies of one script.
#[derive(Debug, Clone)]
pub struct FakeFrameFactory {
    steps: Vec<Step>,
}

impl FakeFrameFactory {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }
}

impl FrameFactory for FakeFrameFactory {
    fn fresh(&self) -> Box<dyn SessionFrame> {
        Box::new(ScriptedFrame::new(self.steps.clone()))
    }

    fn restore(&self, snapshot: FrameSnapshot) -> Result<Box<dyn SessionFrame>> {
        let script: Script = serde_json::from_value(snapshot.0)?;
        Ok(Box::new(ScriptedFrame {
            script,
            probe: FrameProbe::default(),
        }))
    }
}

/// Serializes frames as their JSON snapshot, without any envelope.
pub struct SnapshotSerializer {
    frames: Arc<dyn FrameFactory>,
}

impl SnapshotSerializer {
    pub fn new(frames: Arc<dyn FrameFactory>) -> Self {
        Self { frames }
    }
}

impl SessionSerializer for SnapshotSerializer {
    fn serialize(&self, frame: &dyn SessionFrame) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&frame.snapshot())?)
    }

    fn restore(&self, bytes: &[u8]) -> Result<Box<dyn SessionFrame>> {
        let snapshot: FrameSnapshot = serde_json::from_slice(bytes)?;
        self.frames.restore(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Term {
    Literal(String),
    Variable(String),
    Number(f64),
}

/// Expression produced by [`FakeExpressionParser`].
#[derive(Debug, Clone, PartialEq)]
pub struct FakeExpression {
    source: String,
    term: Term,
}

impl Expression for FakeExpression {
    fn source(&self) -> &str {
        &self.source
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Understands `'literal'`, numbers and `$name` lookups of committed session data.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeExpressionParser;

impl ExpressionParser for FakeExpressionParser {
    fn parse(&self, text: &str) -> std::result::Result<Box<dyn Expression>, String> {
        let trimmed = text.trim();
        let term = if let Some(rest) = trimmed.strip_prefix('\'') {
            let literal = rest
                .strip_suffix('\'')
                .ok_or_else(|| format!("unterminated string literal in {trimmed}"))?;
            Term::Literal(literal.to_string())
        } else if let Some(name) = trimmed.strip_prefix('$') {
            if name.is_empty() {
                return Err("empty variable name".to_string());
            }
            Term::Variable(name.to_string())
        } else if let Ok(number) = trimmed.parse::<f64>() {
            Term::Number(number)
        } else {
            return Err(format!("unsupported expression: {trimmed}"));
        };
        Ok(Box::new(FakeExpression {
            source: text.to_string(),
            term,
        }))
    }
}

struct FakeEvaluationContext<'a> {
    data: &'a [(String, String)],
}

impl EvaluationContext for FakeEvaluationContext<'_> {
    fn evaluate(&self, expression: &dyn Expression) -> std::result::Result<Value, String> {
        let expression = expression
            .as_any()
            .downcast_ref::<FakeExpression>()
            .ok_or_else(|| "expression was not built by this engine".to_string())?;
        match &expression.term {
            Term::Literal(text) => Ok(Value::String(text.clone())),
            Term::Number(number) => Ok(Value::Number(*number)),
            Term::Variable(name) => self
                .data
                .iter()
                .rev()
                .find(|(key, _)| key == name)
                .map(|(_, value)| Value::String(value.clone()))
                .ok_or_else(|| format!("no session data named {name}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Instances and app
// ---------------------------------------------------------------------------

/// Map-backed virtual instance storage.
#[derive(Debug, Default)]
pub struct InMemoryInstanceStorage {
    instances: Mutex<HashMap<String, VirtualInstance>>,
}

impl VirtualInstanceStorage for InMemoryInstanceStorage {
    fn write(&self, instance: VirtualInstance) -> Result<String> {
        let key = Uuid::new_v4().to_string();
        locked(&self.instances).insert(key.clone(), instance);
        Ok(key)
    }

    fn write_with_key(&self, key: &str, instance: VirtualInstance) -> Result<String> {
        let mut instances = locked(&self.instances);
        if instances.contains_key(key) {
            return Err(NavigationError::internal(format!(
                "virtual instance '{key}' already exists"
            )));
        }
        instances.insert(key.to_string(), instance);
        Ok(key.to_string())
    }

    fn read(&self, key: &str) -> Option<VirtualInstance> {
        locked(&self.instances).get(key).cloned()
    }

    fn contains(&self, key: &str) -> bool {
        locked(&self.instances).contains_key(key)
    }
}

#[derive(Debug)]
pub struct FakeInstalledApp {
    title: String,
    endpoints: Vec<Endpoint>,
    locale: Mutex<Option<String>>,
}

impl FakeInstalledApp {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            endpoints: Vec::new(),
            locale: Mutex::new(None),
        }
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Last locale applied to the app.
    pub fn locale(&self) -> Option<String> {
        locked(&self.locale).clone()
    }
}

impl InstalledApp for FakeInstalledApp {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn version(&self) -> String {
        "1".to_string()
    }

    fn endpoint(&self, id: &str) -> Option<Endpoint> {
        self.endpoints.iter().find(|e| e.id == id).cloned()
    }

    fn set_locale(&self, locale: &str) {
        *locked(&self.locale) = Some(locale.to_string());
    }
}

// ---------------------------------------------------------------------------
// Screens
// ---------------------------------------------------------------------------

/// How entity screens built by a [`FakeScreenFactory`] behave. Read on every
/// call, so changing it also affects screens already in a cache.
#[derive(Debug, Clone, Default)]
pub struct EntityBehavior {
    pub auto_launch: bool,
    pub skip: bool,
    pub auto_select: bool,
    /// Limits `skip` and `auto_select` to the screen for this datum id.
    pub only_for: Option<String>,
    /// Returned from input handling instead of touching the frame.
    pub fail_with: Option<ScreenError>,
}

#[derive(Debug, Default)]
struct ScreenLog {
    inits: AtomicUsize,
    entity_inits: AtomicUsize,
    entity_constructions: AtomicUsize,
    entity_events: Mutex<Vec<String>>,
    menu_inputs: Mutex<Vec<String>>,
    last_sync_user: Mutex<Option<String>>,
    entity_behavior: Mutex<EntityBehavior>,
    menu_auto_advance: AtomicBool,
}

impl ScreenLog {
    fn entity_event(&self, event: String) {
        locked(&self.entity_events).push(event);
    }
}

fn commit_needed(frame: &mut dyn SessionFrame, value: String) -> ScreenResult<()> {
    let datum = frame
        .needed_datum()
        .ok_or_else(|| ScreenError::MissingValue("no datum is pending".to_string()))?;
    frame.commit(CommitTarget::Datum(datum), value);
    Ok(())
}

#[derive(Debug)]
struct FakeMenuScreen {
    log: Arc<ScreenLog>,
}

impl ScreenBehavior for FakeMenuScreen {
    fn name(&self) -> String {
        "menu".to_string()
    }

    fn init(&mut self, _frame: &mut dyn SessionFrame) -> ScreenResult<()> {
        self.log.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn handle_input_and_update_session(
        &mut self,
        frame: &mut dyn SessionFrame,
        input: &str,
        _allow_auto_launch: bool,
        _selected_values: &[String],
        _respect_relevancy: bool,
    ) -> ScreenResult<()> {
        locked(&self.log.menu_inputs).push(input.to_string());
        let index: usize = input
            .parse()
            .map_err(|_| ScreenError::MissingValue(format!("no menu choice '{input}'")))?;
        if index >= MENU_CHOICES {
            return Err(ScreenError::IndexOutOfBounds {
                index,
                len: MENU_CHOICES,
            });
        }
        frame.set_command(format!("m{index}"));
        Ok(())
    }

    fn breadcrumb(&self, input: &str, _frame: &dyn SessionFrame) -> String {
        format!("Menu {input}")
    }
}

impl MenuScreen for FakeMenuScreen {
    fn handle_auto_menu_advance(
        &mut self,
        frame: &mut dyn SessionFrame,
        _respect_relevancy: bool,
    ) -> ScreenResult<bool> {
        if !self.log.menu_auto_advance.load(Ordering::SeqCst) {
            return Ok(false);
        }
        frame.set_command("m0".to_string());
        Ok(true)
    }
}

/// Entity screen double; doubles as a multi-select screen when given storage.
pub struct FakeEntityScreen {
    name: String,
    log: Arc<ScreenLog>,
    storage: Option<Arc<dyn VirtualInstanceStorage>>,
    reference: Option<String>,
    skipped: bool,
}

impl fmt::Debug for FakeEntityScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeEntityScreen")
            .field("name", &self.name)
            .field("reference", &self.reference)
            .field("skipped", &self.skipped)
            .finish_non_exhaustive()
    }
}

impl FakeEntityScreen {
    fn new(
        name: &str,
        log: Arc<ScreenLog>,
        storage: Option<Arc<dyn VirtualInstanceStorage>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            log,
            storage,
            reference: None,
            skipped: false,
        }
    }

    /// A standalone shared screen with default behaviour.
    pub fn shared(name: &str) -> SharedEntityScreen {
        Rc::new(RefCell::new(Self::new(name, Arc::default(), None)))
    }

    fn behavior(&self) -> EntityBehavior {
        locked(&self.log.entity_behavior).clone()
    }

    fn targeted(&self, behavior: &EntityBehavior) -> bool {
        behavior.only_for.as_deref().is_none_or(|id| id == self.name)
    }

    fn fail_if_configured(&self) -> ScreenResult<()> {
        match self.behavior().fail_with {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl ScreenBehavior for FakeEntityScreen {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn init(&mut self, _frame: &mut dyn SessionFrame) -> ScreenResult<()> {
        self.log.inits.fetch_add(1, Ordering::SeqCst);
        self.log.entity_inits.fetch_add(1, Ordering::SeqCst);
        self.log.entity_event("init".to_string());
        let behavior = self.behavior();
        self.skipped = behavior.skip && self.targeted(&behavior);
        Ok(())
    }

    fn should_be_skipped(&self) -> bool {
        self.skipped
    }

    fn handle_input_and_update_session(
        &mut self,
        frame: &mut dyn SessionFrame,
        input: &str,
        _allow_auto_launch: bool,
        selected_values: &[String],
        _respect_relevancy: bool,
    ) -> ScreenResult<()> {
        self.log.entity_event(format!("handle:{input}"));
        self.fail_if_configured()?;
        if input.starts_with(ACTION_PREFIX) {
            return Ok(());
        }
        if input == USE_SELECTED_VALUES {
            let storage = self
                .storage
                .as_ref()
                .ok_or_else(|| ScreenError::MissingValue("instance storage".to_string()))?;
            if selected_values.is_empty() {
                return Err(ScreenError::MissingValue("selected values".to_string()));
            }
            let key = store_selected_values(storage.as_ref(), selected_values, &self.name)
                .map_err(|err| ScreenError::Session(err.to_string()))?;
            self.reference = Some(key.clone());
            return commit_needed(frame, key);
        }
        commit_needed(frame, input.to_string())
    }

    fn breadcrumb(&self, input: &str, _frame: &dyn SessionFrame) -> String {
        format!("{} {}", self.name, input)
    }
}

impl EntityScreen for FakeEntityScreen {
    fn has_auto_launch_action(&self) -> bool {
        self.behavior().auto_launch
    }

    fn auto_select_entities(&mut self, frame: &mut dyn SessionFrame) -> ScreenResult<bool> {
        self.log.entity_event("auto_select".to_string());
        let behavior = self.behavior();
        if !behavior.auto_select || !self.targeted(&behavior) {
            return Ok(false);
        }
        commit_needed(frame, "auto-selected".to_string())?;
        Ok(true)
    }

    fn update_datum(&mut self, frame: &mut dyn SessionFrame, input: &str) -> ScreenResult<()> {
        self.log.entity_event(format!("update:{input}"));
        self.fail_if_configured()?;
        commit_needed(frame, input.to_string())
    }
}

impl MultiSelectEntityScreen for FakeEntityScreen {
    fn storage_reference_id(&self) -> Option<String> {
        self.reference.clone()
    }
}

/// Query and sync screens: any input completes the request.
struct FakeRequestScreen {
    label: &'static str,
    log: Arc<ScreenLog>,
    storage: Option<Arc<dyn VirtualInstanceStorage>>,
}

impl fmt::Debug for FakeRequestScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeRequestScreen")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl ScreenBehavior for FakeRequestScreen {
    fn name(&self) -> String {
        self.label.to_string()
    }

    fn init(&mut self, _frame: &mut dyn SessionFrame) -> ScreenResult<()> {
        self.log.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn handle_input_and_update_session(
        &mut self,
        frame: &mut dyn SessionFrame,
        input: &str,
        _allow_auto_launch: bool,
        _selected_values: &[String],
        _respect_relevancy: bool,
    ) -> ScreenResult<()> {
        if let Some(storage) = &self.storage {
            let inputs = [("search".to_string(), input.to_string())];
            storage
                .write(VirtualInstance::search_input(self.label, &inputs))
                .map_err(|err| ScreenError::Session(err.to_string()))?;
        }
        frame.commit(CommitTarget::Sentinel(self.label), input.to_string());
        Ok(())
    }

    fn breadcrumb(&self, _input: &str, _frame: &dyn SessionFrame) -> String {
        self.label.to_string()
    }
}

/// Builds fake screens and records what they were asked to do.
#[derive(Debug, Default)]
pub struct FakeScreenFactory {
    log: Arc<ScreenLog>,
}

impl FakeScreenFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_entity_behavior(&self, behavior: EntityBehavior) {
        *locked(&self.log.entity_behavior) = behavior;
    }

    /// Makes every menu advance itself when asked to.
    pub fn set_menu_auto_advance(&self, enabled: bool) {
        self.log.menu_auto_advance.store(enabled, Ordering::SeqCst);
    }

    /// `init` calls across every screen this factory built.
    pub fn inits(&self) -> usize {
        self.log.inits.load(Ordering::SeqCst)
    }

    pub fn entity_inits(&self) -> usize {
        self.log.entity_inits.load(Ordering::SeqCst)
    }

    pub fn entity_constructions(&self) -> usize {
        self.log.entity_constructions.load(Ordering::SeqCst)
    }

    /// `init`, `handle:<input>`, `update:<input>` and `auto_select` events, in order.
    pub fn entity_log(&self) -> Vec<String> {
        locked(&self.log.entity_events).clone()
    }

    pub fn menu_inputs(&self) -> Vec<String> {
        locked(&self.log.menu_inputs).clone()
    }

    pub fn last_sync_user(&self) -> Option<String> {
        locked(&self.log.last_sync_user).clone()
    }
}

impl ScreenFactory for FakeScreenFactory {
    fn menu(&self) -> Box<dyn MenuScreen> {
        Box::new(FakeMenuScreen {
            log: self.log.clone(),
        })
    }

    fn entity(
        &self,
        datum: &EntityDatum,
        _needs_full_entity_screen: bool,
        _context: &EntityScreenContext,
    ) -> ScreenResult<SharedEntityScreen> {
        self.log.entity_constructions.fetch_add(1, Ordering::SeqCst);
        Ok(Rc::new(RefCell::new(FakeEntityScreen::new(
            &datum.data_id,
            self.log.clone(),
            None,
        ))))
    }

    fn multi_select_entity(
        &self,
        datum: &EntityDatum,
        _needs_full_entity_screen: bool,
        storage: Arc<dyn VirtualInstanceStorage>,
        _context: &EntityScreenContext,
    ) -> ScreenResult<SharedMultiSelectScreen> {
        self.log.entity_constructions.fetch_add(1, Ordering::SeqCst);
        Ok(Rc::new(RefCell::new(FakeEntityScreen::new(
            &datum.data_id,
            self.log.clone(),
            Some(storage),
        ))))
    }

    fn query(&self, storage: Arc<dyn VirtualInstanceStorage>) -> Box<dyn ScreenBehavior> {
        Box::new(FakeRequestScreen {
            label: "query",
            log: self.log.clone(),
            storage: Some(storage),
        })
    }

    fn sync(&self, as_user: Option<String>) -> Box<dyn ScreenBehavior> {
        *locked(&self.log.last_sync_user) = as_user;
        Box::new(FakeRequestScreen {
            label: "sync",
            log: self.log.clone(),
            storage: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Assemblies
// ---------------------------------------------------------------------------

/// Services backed by fakes, plus a handle on the screen factory.
pub fn services_with_factory(
    app: Arc<FakeInstalledApp>,
    steps: Vec<Step>,
) -> (SessionServices, Arc<FakeScreenFactory>) {
    let screens = Arc::new(FakeScreenFactory::new());
    let services = SessionServices {
        app,
        frames: Arc::new(FakeFrameFactory::new(steps)),
        screens: screens.clone(),
        expressions: Arc::new(FakeExpressionParser),
        instance_storage: Arc::new(InMemoryInstanceStorage::default()),
    };
    (services, screens)
}

pub fn services(app: Arc<FakeInstalledApp>, steps: Vec<Step>) -> SessionServices {
    services_with_factory(app, steps).0
}

/// A session state wired to fakes, for driving the engine directly.
pub struct TestHarness {
    pub state: SessionState,
    pub env: NavigationEnv,
    pub screens: Arc<FakeScreenFactory>,
}

impl TestHarness {
    pub fn new(frame: ScriptedFrame) -> Self {
        let screens = Arc::new(FakeScreenFactory::new());
        Self {
            state: SessionState::new(Box::new(frame), TEST_APP_TITLE),
            env: NavigationEnv {
                screens: screens.clone(),
                expressions: Arc::new(FakeExpressionParser),
                instance_storage: Arc::new(InMemoryInstanceStorage::default()),
                sync_as_user: None,
            },
            screens,
        }
    }

    pub fn resolve(&mut self) -> Result<Option<Screen>> {
        navigation::resolve(
            &mut self.state,
            &self.env,
            true,
            &EntityScreenContext::default(),
        )
    }

    pub fn handle(&mut self, input: &str, options: InputOptions) -> Result<bool> {
        self.handle_with_context(input, options, &EntityScreenContext::default())
    }

    pub fn handle_with_context(
        &mut self,
        input: &str,
        options: InputOptions,
        context: &EntityScreenContext,
    ) -> Result<bool> {
        navigation::handle_input(&mut self.state, &self.env, None, input, options, context)
    }

    pub fn handle_on(&mut self, screen: Screen, input: &str, options: InputOptions) -> Result<bool> {
        navigation::handle_input(
            &mut self.state,
            &self.env,
            Some(screen),
            input,
            options,
            &EntityScreenContext::default(),
        )
    }
}
