//! Built-in tasks.
//!
//! Policy for malformed shapes is the same for every built-in composite and
//! decorator: instancing rejects a tree whose tasks have fewer children than
//! [`Task::min_children`], and a task that is ticked anyway without the
//! children it needs returns [`BehaviorResult::Failure`] and logs a warning.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{
    error::BindError, Agent, BBBool, BBInt, BBParam, BehaviorResult, Blackboard,
    Lazy, NumChildren, ParamBinding, PortBinding, PortSpec, PortType, Symbol, Task, TaskContext,
    Variant, VariantType,
};

fn bind_input(param: &mut BBParam, key: Symbol, binding: PortBinding) -> Result<(), BindError> {
    match binding {
        PortBinding::Input(binding) => Ok(param.bind(binding)?),
        PortBinding::InOut(var) => {
            param.set_variable(var);
            Ok(())
        }
        PortBinding::Output(_) => Err(BindError::WrongDirection(key.to_string())),
    }
}

fn bind_output(slot: &mut Option<Symbol>, key: Symbol, binding: PortBinding) -> Result<(), BindError> {
    match binding {
        PortBinding::Output(var)
        | PortBinding::InOut(var)
        | PortBinding::Input(ParamBinding::Variable(var)) => {
            *slot = Some(var);
            Ok(())
        }
        PortBinding::Input(ParamBinding::Literal(_)) => Err(BindError::LiteralOutput(key.to_string())),
    }
}

/// Resolves an untyped binding: a literal as is, a variable as whatever the
/// blackboard holds.
fn resolve_raw(binding: &ParamBinding, blackboard: &Blackboard) -> Option<Variant> {
    match binding {
        ParamBinding::Literal(value) => Some(value.clone()),
        ParamBinding::Variable(key) => blackboard.get(*key),
    }
}

macro_rules! no_children {
    ($ctx:expr, $name:expr) => {
        if $ctx.child_count() == 0 {
            warn!("{} ticked without children", $name);
            return BehaviorResult::Failure;
        }
    };
}

// Composites

/// Ticks children in order until one fails.
///
/// A running child pauses the sequence; the next tick resumes at that child
/// without re-ticking the ones that already succeeded.
#[derive(Clone, Default)]
pub struct Sequence {
    current_child: Option<usize>,
}

impl<A: Agent> Task<A> for Sequence {
    fn max_children(&self) -> NumChildren {
        NumChildren::Infinite
    }

    fn min_children(&self) -> usize {
        1
    }

    fn reset(&mut self) {
        self.current_child = None;
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        no_children!(ctx, "Sequence");
        let from = self.current_child.unwrap_or(0);
        for i in from..ctx.child_count() {
            match ctx.tick_child(i) {
                BehaviorResult::Failure => {
                    self.current_child = None;
                    return BehaviorResult::Failure;
                }
                BehaviorResult::Running => {
                    self.current_child = Some(i);
                    return BehaviorResult::Running;
                }
                BehaviorResult::Success => (),
            }
        }
        self.current_child = None;
        BehaviorResult::Success
    }
}

/// Ticks children in order until one succeeds, resuming at a running child
/// like [`Sequence`].
#[derive(Clone, Default)]
pub struct Selector {
    current_child: Option<usize>,
}

impl<A: Agent> Task<A> for Selector {
    fn max_children(&self) -> NumChildren {
        NumChildren::Infinite
    }

    fn min_children(&self) -> usize {
        1
    }

    fn reset(&mut self) {
        self.current_child = None;
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        no_children!(ctx, "Selector");
        let from = self.current_child.unwrap_or(0);
        for i in from..ctx.child_count() {
            match ctx.tick_child(i) {
                BehaviorResult::Success => {
                    self.current_child = None;
                    return BehaviorResult::Success;
                }
                BehaviorResult::Running => {
                    self.current_child = Some(i);
                    return BehaviorResult::Running;
                }
                BehaviorResult::Failure => (),
            }
        }
        self.current_child = None;
        BehaviorResult::Failure
    }
}

/// A sequence that re-evaluates from the first child on every tick.
///
/// When an earlier child starts running or the sequence finishes, the child
/// that was running before is aborted.
#[derive(Clone, Default)]
pub struct ReactiveSequence {
    running: Option<usize>,
}

fn switch_running<A>(running: &mut Option<usize>, now: Option<usize>, ctx: &mut TaskContext<A>) {
    if let Some(prev) = running.filter(|prev| Some(*prev) != now) {
        ctx.abort_child(prev);
    }
    *running = now;
}

impl<A: Agent> Task<A> for ReactiveSequence {
    fn max_children(&self) -> NumChildren {
        NumChildren::Infinite
    }

    fn min_children(&self) -> usize {
        1
    }

    fn reset(&mut self) {
        self.running = None;
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        no_children!(ctx, "ReactiveSequence");
        for i in 0..ctx.child_count() {
            match ctx.tick_child(i) {
                BehaviorResult::Success => (),
                BehaviorResult::Failure => {
                    switch_running(&mut self.running, None, ctx);
                    return BehaviorResult::Failure;
                }
                BehaviorResult::Running => {
                    switch_running(&mut self.running, Some(i), ctx);
                    return BehaviorResult::Running;
                }
            }
        }
        switch_running(&mut self.running, None, ctx);
        BehaviorResult::Success
    }
}

/// A selector that re-evaluates from the first child on every tick, so a
/// higher priority child can preempt a running one.
#[derive(Clone, Default)]
pub struct ReactiveSelector {
    running: Option<usize>,
}

impl<A: Agent> Task<A> for ReactiveSelector {
    fn max_children(&self) -> NumChildren {
        NumChildren::Infinite
    }

    fn min_children(&self) -> usize {
        1
    }

    fn reset(&mut self) {
        self.running = None;
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        no_children!(ctx, "ReactiveSelector");
        for i in 0..ctx.child_count() {
            match ctx.tick_child(i) {
                BehaviorResult::Failure => (),
                BehaviorResult::Success => {
                    switch_running(&mut self.running, None, ctx);
                    return BehaviorResult::Success;
                }
                BehaviorResult::Running => {
                    switch_running(&mut self.running, Some(i), ctx);
                    return BehaviorResult::Running;
                }
            }
        }
        switch_running(&mut self.running, None, ctx);
        BehaviorResult::Failure
    }
}

static SUCCESSES: Lazy<Symbol> = Lazy::new(|| "successes".into());
static FAILURES: Lazy<Symbol> = Lazy::new(|| "failures".into());
static REPEAT: Lazy<Symbol> = Lazy::new(|| "repeat".into());

/// Ticks all children each tick.
///
/// Succeeds once `successes` children have succeeded and fails once
/// `failures` children have failed, checked in that order. Children that
/// finished stay finished until the parallel completes, unless `repeat` is
/// set. Without `repeat`, it fails once every child finished and neither
/// count was reached. Still running children are aborted on completion.
#[derive(Clone)]
pub struct Parallel {
    num_successes_required: BBInt,
    num_failures_required: BBInt,
    repeat: BBBool,
    finished: Vec<Option<BehaviorResult>>,
}

impl Default for Parallel {
    fn default() -> Self {
        Self {
            num_successes_required: BBInt::literal(1),
            num_failures_required: BBInt::literal(1),
            repeat: BBBool::literal(false),
            finished: vec![],
        }
    }
}

impl Parallel {
    pub fn new(num_successes_required: i64, num_failures_required: i64) -> Self {
        Self {
            num_successes_required: BBInt::literal(num_successes_required),
            num_failures_required: BBInt::literal(num_failures_required),
            ..Self::default()
        }
    }
}

impl<A: Agent> Task<A> for Parallel {
    fn provided_ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::new_in(*SUCCESSES, VariantType::Int),
            PortSpec::new_in(*FAILURES, VariantType::Int),
            PortSpec::new_in(*REPEAT, VariantType::Bool),
        ]
    }

    fn bind_port(&mut self, key: Symbol, binding: PortBinding) -> Result<(), BindError> {
        let param = if key == *SUCCESSES {
            self.num_successes_required.param_mut()
        } else if key == *FAILURES {
            self.num_failures_required.param_mut()
        } else if key == *REPEAT {
            self.repeat.param_mut()
        } else {
            return Err(BindError::UnknownPort(key.to_string()));
        };
        bind_input(param, key, binding)
    }

    fn max_children(&self) -> NumChildren {
        NumChildren::Infinite
    }

    fn min_children(&self) -> usize {
        1
    }

    fn reset(&mut self) {
        self.finished.clear();
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        no_children!(ctx, "Parallel");
        let agent = ctx.agent();
        let bb = ctx.blackboard();
        let successes = self.num_successes_required.resolve(agent, bb, 1).max(1) as usize;
        let failures = self.num_failures_required.resolve(agent, bb, 1).max(1) as usize;
        let repeat = self.repeat.resolve(agent, bb, false);

        let count = ctx.child_count();
        self.finished.resize(count, None);
        for i in 0..count {
            if !repeat && self.finished[i].is_some() {
                continue;
            }
            match ctx.tick_child(i) {
                BehaviorResult::Running => self.finished[i] = None,
                res => self.finished[i] = Some(res),
            }
        }

        let count_of = |want| self.finished.iter().filter(|res| **res == Some(want)).count();
        let result = if count_of(BehaviorResult::Success) >= successes {
            BehaviorResult::Success
        } else if count_of(BehaviorResult::Failure) >= failures {
            BehaviorResult::Failure
        } else if !repeat && self.finished.iter().all(Option::is_some) {
            debug!("Parallel: every child finished without reaching a threshold");
            BehaviorResult::Failure
        } else {
            return BehaviorResult::Running;
        };
        ctx.abort_children();
        self.finished.clear();
        result
    }
}

/// `if (condition) { then } else { otherwise }`.
///
/// The first child is the condition, the second the `then` branch and the
/// optional third the `else` branch. A missing `else` branch is not an
/// error: the node succeeds when the condition fails.
#[derive(Clone, Default)]
pub struct If {
    condition_result: Option<BehaviorResult>,
}

impl<A: Agent> Task<A> for If {
    fn max_children(&self) -> NumChildren {
        NumChildren::Finite(3)
    }

    fn min_children(&self) -> usize {
        2
    }

    fn reset(&mut self) {
        self.condition_result = None;
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        let condition_result = match self.condition_result {
            Some(res) => res,
            None => ctx.tick_child(0),
        };

        // Remember the last conditional result in case the branch returns Running
        self.condition_result = Some(condition_result);

        let branch_result = match condition_result {
            BehaviorResult::Success => ctx.tick_child(1),
            BehaviorResult::Failure if ctx.child_count() > 2 => ctx.tick_child(2),
            BehaviorResult::Failure => BehaviorResult::Success,
            BehaviorResult::Running => {
                // Evaluate the condition again on the next tick
                self.condition_result = None;
                BehaviorResult::Running
            }
        };

        if !matches!(branch_result, BehaviorResult::Running) {
            self.condition_result = None;
        }

        branch_result
    }
}

// Decorators

macro_rules! decorator_shape {
    () => {
        fn max_children(&self) -> NumChildren {
            NumChildren::Finite(1)
        }

        fn min_children(&self) -> usize {
            1
        }
    };
}

/// Swaps success and failure of its child.
#[derive(Clone, Default)]
pub struct Inverter;

impl<A: Agent> Task<A> for Inverter {
    decorator_shape!();

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        no_children!(ctx, "Inverter");
        match ctx.tick_child(0) {
            BehaviorResult::Running => BehaviorResult::Running,
            BehaviorResult::Success => BehaviorResult::Failure,
            BehaviorResult::Failure => BehaviorResult::Success,
        }
    }
}

/// Succeeds whenever its child finishes.
#[derive(Clone, Default)]
pub struct ForceSuccess;

impl<A: Agent> Task<A> for ForceSuccess {
    decorator_shape!();

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        no_children!(ctx, "ForceSuccess");
        match ctx.tick_child(0) {
            BehaviorResult::Running => BehaviorResult::Running,
            _ => BehaviorResult::Success,
        }
    }
}

/// Fails whenever its child finishes.
#[derive(Clone, Default)]
pub struct ForceFailure;

impl<A: Agent> Task<A> for ForceFailure {
    decorator_shape!();

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        no_children!(ctx, "ForceFailure");
        match ctx.tick_child(0) {
            BehaviorResult::Running => BehaviorResult::Running,
            _ => BehaviorResult::Failure,
        }
    }
}

static N: Lazy<Symbol> = Lazy::new(|| "n".into());

/// Runs its child `n` times in a row, one run per tick.
///
/// Reports running between runs and succeeds with the `n`th success. A
/// child failure fails the decorator and starts the count over. `n` is read
/// when a new count starts; a count below one succeeds without ticking the
/// child.
#[derive(Clone, Default)]
pub struct Repeat {
    n: BBInt,
    remaining: Option<i64>,
}

impl Repeat {
    pub fn new(n: i64) -> Self {
        Self {
            n: BBInt::literal(n),
            remaining: None,
        }
    }
}

impl<A: Agent> Task<A> for Repeat {
    decorator_shape!();

    fn provided_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::new_in(*N, VariantType::Int)]
    }

    fn bind_port(&mut self, key: Symbol, binding: PortBinding) -> Result<(), BindError> {
        if key != *N {
            return Err(BindError::UnknownPort(key.to_string()));
        }
        bind_input(self.n.param_mut(), key, binding)
    }

    fn reset(&mut self) {
        self.remaining = None;
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        no_children!(ctx, "Repeat");
        let remaining = match self.remaining {
            Some(remaining) => remaining,
            None => self.n.resolve(ctx.agent(), ctx.blackboard(), 0),
        };
        if remaining <= 0 {
            self.remaining = None;
            return BehaviorResult::Success;
        }
        match ctx.tick_child(0) {
            BehaviorResult::Success if remaining == 1 => {
                self.remaining = None;
                BehaviorResult::Success
            }
            BehaviorResult::Success => {
                self.remaining = Some(remaining - 1);
                BehaviorResult::Running
            }
            BehaviorResult::Running => {
                self.remaining = Some(remaining);
                BehaviorResult::Running
            }
            BehaviorResult::Failure => {
                self.remaining = None;
                BehaviorResult::Failure
            }
        }
    }
}

/// Re-runs a failing child up to `n` times, one attempt per tick.
///
/// Succeeds as soon as the child does; fails once `n` attempts failed.
#[derive(Clone, Default)]
pub struct Retry {
    n: BBInt,
    remaining: Option<i64>,
}

impl Retry {
    pub fn new(n: i64) -> Self {
        Self {
            n: BBInt::literal(n),
            remaining: None,
        }
    }
}

impl<A: Agent> Task<A> for Retry {
    decorator_shape!();

    fn provided_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::new_in(*N, VariantType::Int)]
    }

    fn bind_port(&mut self, key: Symbol, binding: PortBinding) -> Result<(), BindError> {
        if key != *N {
            return Err(BindError::UnknownPort(key.to_string()));
        }
        bind_input(self.n.param_mut(), key, binding)
    }

    fn reset(&mut self) {
        self.remaining = None;
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        no_children!(ctx, "Retry");
        let remaining = match self.remaining {
            Some(remaining) => remaining,
            None => self.n.resolve(ctx.agent(), ctx.blackboard(), 0),
        };
        if remaining <= 0 {
            self.remaining = None;
            return BehaviorResult::Failure;
        }
        match ctx.tick_child(0) {
            BehaviorResult::Failure if remaining == 1 => {
                self.remaining = None;
                BehaviorResult::Failure
            }
            BehaviorResult::Failure => {
                self.remaining = Some(remaining - 1);
                BehaviorResult::Running
            }
            BehaviorResult::Running => {
                self.remaining = Some(remaining);
                BehaviorResult::Running
            }
            BehaviorResult::Success => {
                self.remaining = None;
                BehaviorResult::Success
            }
        }
    }
}

/// Keeps ticking its child until it fails, then succeeds.
#[derive(Clone, Default)]
pub struct RepeatUntilFailure;

impl<A: Agent> Task<A> for RepeatUntilFailure {
    decorator_shape!();

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        no_children!(ctx, "RepeatUntilFailure");
        match ctx.tick_child(0) {
            BehaviorResult::Failure => BehaviorResult::Success,
            _ => BehaviorResult::Running,
        }
    }
}

/// Runs its child in a child blackboard scope.
///
/// The child reads outer variables through the scope chain, but everything
/// it writes stays local. Input ports are copied into the local scope
/// before each tick, and output ports are copied back out afterwards, even
/// when the child failed or is still running.
#[derive(Clone, Default)]
pub struct NewScope {
    label: Option<String>,
    params: Vec<PortSpec>,
    blackboard_data: HashMap<Symbol, Variant>,
    inputs: Vec<(Symbol, ParamBinding)>,
    outputs: Vec<(Symbol, Symbol)>,
    scope: Option<Blackboard>,
}

impl NewScope {
    /// A scope declaring `params` as its ports, as subtrees do.
    pub fn new(label: impl Into<String>, params: Vec<PortSpec>) -> Self {
        Self {
            label: Some(label.into()),
            params,
            ..Self::default()
        }
    }

    fn name_or_default(&self) -> &str {
        self.label.as_deref().unwrap_or("NewScope")
    }

    /// Initial values of the local scope, set when the instance is created.
    pub fn with_data(mut self, data: HashMap<Symbol, Variant>) -> Self {
        self.blackboard_data = data;
        self
    }
}

impl<A: Agent> Task<A> for NewScope {
    fn name(&self) -> &str {
        self.name_or_default()
    }

    decorator_shape!();

    fn provided_ports(&self) -> Vec<PortSpec> {
        self.params.clone()
    }

    fn bind_port(&mut self, key: Symbol, binding: PortBinding) -> Result<(), BindError> {
        if !self.params.is_empty() && !self.params.iter().any(|p| p.key == key) {
            return Err(BindError::UnknownPort(key.to_string()));
        }
        match binding {
            PortBinding::Input(binding) => self.inputs.push((key, binding)),
            PortBinding::Output(var) => self.outputs.push((key, var)),
            PortBinding::InOut(var) => {
                self.inputs.push((key, ParamBinding::Variable(var)));
                self.outputs.push((key, var));
            }
        }
        Ok(())
    }

    fn scope(&mut self, blackboard: &Blackboard) -> Blackboard {
        let scope = Blackboard::with_parent(blackboard);
        scope.set_data(self.blackboard_data.clone());
        self.scope = Some(scope.clone());
        scope
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        no_children!(ctx, "NewScope");
        let Some(scope) = self.scope.clone() else {
            warn!("NewScope ticked before its scope was created");
            return BehaviorResult::Failure;
        };
        // An input that can not be read falls back to its seed value, or is
        // cleared
        let fallback = |key: &Symbol| match self.blackboard_data.get(key) {
            Some(seed) => scope.set_var(*key, seed.clone()),
            None => {
                scope.erase_var(*key);
            }
        };
        for (key, binding) in &self.inputs {
            let Some(value) = resolve_raw(binding, ctx.blackboard()) else {
                fallback(key);
                continue;
            };
            let value_type = self
                .params
                .iter()
                .find(|param| param.key == *key)
                .and_then(|param| param.value_type);
            let value = match value_type {
                Some(ty) => match value.coerce(ty) {
                    Some(value) => value,
                    None => {
                        debug!(
                            "{}: input {} is {}, expected {}",
                            self.name_or_default(),
                            key,
                            value.get_type(),
                            ty
                        );
                        fallback(key);
                        continue;
                    }
                },
                None => value,
            };
            scope.set_var(*key, value);
        }
        let res = ctx.tick_child(0);
        for (key, var) in &self.outputs {
            if let Some(value) = scope.get_local(*key) {
                ctx.blackboard().set_var(*var, value);
            }
        }
        res
    }
}

// Leaves

pub(crate) static VALUE: Lazy<Symbol> = Lazy::new(|| "value".into());
pub(crate) static OUTPUT: Lazy<Symbol> = Lazy::new(|| "output".into());
pub(crate) static INPUT: Lazy<Symbol> = Lazy::new(|| "input".into());

/// Writes a boolean to a blackboard variable. Desugared from `var x = true`.
///
/// Fails without an `output` variable, since there is nowhere to write.
#[derive(Clone, Default)]
pub struct SetBool {
    value: BBBool,
    output: Option<Symbol>,
}

impl<A: Agent> Task<A> for SetBool {
    fn provided_ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::new_in(*VALUE, VariantType::Bool),
            PortSpec::new_out(*OUTPUT),
        ]
    }

    fn bind_port(&mut self, key: Symbol, binding: PortBinding) -> Result<(), BindError> {
        if key == *VALUE {
            bind_input(self.value.param_mut(), key, binding)
        } else if key == *OUTPUT {
            bind_output(&mut self.output, key, binding)
        } else {
            Err(BindError::UnknownPort(key.to_string()))
        }
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        let Some(output) = self.output else {
            warn!("SetBool has no output variable");
            return BehaviorResult::Failure;
        };
        let value = self.value.resolve(ctx.agent(), ctx.blackboard(), false);
        ctx.blackboard().set_var(output, value);
        BehaviorResult::Success
    }
}

/// Copies any value into a blackboard variable.
///
/// Fails without an `output` variable, or when `value` is bound to a
/// variable that is not set.
#[derive(Clone)]
pub struct SetVar {
    value: ParamBinding,
    output: Option<Symbol>,
}

impl Default for SetVar {
    fn default() -> Self {
        Self {
            value: ParamBinding::Literal(Variant::Nil),
            output: None,
        }
    }
}

impl SetVar {
    pub fn new(output: impl Into<Symbol>, value: ParamBinding) -> Self {
        Self {
            value,
            output: Some(output.into()),
        }
    }
}

impl<A: Agent> Task<A> for SetVar {
    fn provided_ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec {
                ty: PortType::Input,
                key: *VALUE,
                value_type: None,
            },
            PortSpec::new_out(*OUTPUT),
        ]
    }

    fn bind_port(&mut self, key: Symbol, binding: PortBinding) -> Result<(), BindError> {
        if key == *VALUE {
            match binding {
                PortBinding::Input(binding) => self.value = binding,
                PortBinding::InOut(var) => self.value = ParamBinding::Variable(var),
                PortBinding::Output(_) => return Err(BindError::WrongDirection(key.to_string())),
            }
            Ok(())
        } else if key == *OUTPUT {
            bind_output(&mut self.output, key, binding)
        } else {
            Err(BindError::UnknownPort(key.to_string()))
        }
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        let Some(output) = self.output else {
            warn!("SetVar has no output variable");
            return BehaviorResult::Failure;
        };
        match resolve_raw(&self.value, ctx.blackboard()) {
            Some(value) => {
                ctx.blackboard().set_var(output, value);
                BehaviorResult::Success
            }
            None => BehaviorResult::Failure,
        }
    }
}

/// Succeeds if `input` resolves to true. A missing variable counts as false.
#[derive(Clone, Default)]
pub struct IsTrue {
    input: BBBool,
}

impl IsTrue {
    pub fn new(input: BBBool) -> Self {
        Self { input }
    }
}

impl<A: Agent> Task<A> for IsTrue {
    fn provided_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::new_in(*INPUT, VariantType::Bool)]
    }

    fn bind_port(&mut self, key: Symbol, binding: PortBinding) -> Result<(), BindError> {
        if key != *INPUT {
            return Err(BindError::UnknownPort(key.to_string()));
        }
        bind_input(self.input.param_mut(), key, binding)
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        if self.input.resolve(ctx.agent(), ctx.blackboard(), false) {
            BehaviorResult::Success
        } else {
            BehaviorResult::Failure
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckType {
    #[default]
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl CheckType {
    fn parse(s: &str) -> Option<Self> {
        Some(match s.trim() {
            "==" => Self::Equal,
            "!=" => Self::NotEqual,
            "<" => Self::Less,
            "<=" => Self::LessOrEqual,
            ">" => Self::Greater,
            ">=" => Self::GreaterOrEqual,
            _ => return None,
        })
    }

    fn compare(self, lhs: &Variant, rhs: &Variant) -> bool {
        use std::cmp::Ordering;
        let ordering = match (lhs, rhs) {
            (Variant::Int(l), Variant::Int(r)) => Some(l.cmp(r)),
            _ => lhs
                .as_float()
                .zip(rhs.as_float())
                .and_then(|(l, r)| l.partial_cmp(&r)),
        };
        let equal = match ordering {
            Some(ordering) => ordering == Ordering::Equal,
            None => rhs.coerce(lhs.get_type()).as_ref() == Some(lhs),
        };
        match self {
            Self::Equal => equal,
            Self::NotEqual => !equal,
            Self::Less => ordering == Some(Ordering::Less),
            Self::LessOrEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            Self::Greater => ordering == Some(Ordering::Greater),
            Self::GreaterOrEqual => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

static CHECK: Lazy<Symbol> = Lazy::new(|| "check".into());

/// Compares the `input` variable against `value`.
///
/// Numbers compare numerically; other values are equal when `value`
/// coerces to the type of `input` and matches. An unset `input` fails.
#[derive(Clone)]
pub struct CheckVar {
    input: Option<Symbol>,
    value: ParamBinding,
    check: CheckType,
}

impl Default for CheckVar {
    fn default() -> Self {
        Self {
            input: None,
            value: ParamBinding::Literal(Variant::Nil),
            check: CheckType::Equal,
        }
    }
}

impl CheckVar {
    pub fn new(input: impl Into<Symbol>, check: CheckType, value: ParamBinding) -> Self {
        Self {
            input: Some(input.into()),
            value,
            check,
        }
    }
}

impl<A: Agent> Task<A> for CheckVar {
    fn provided_ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec {
                ty: PortType::Input,
                key: *INPUT,
                value_type: None,
            },
            PortSpec {
                ty: PortType::Input,
                key: *VALUE,
                value_type: None,
            },
            PortSpec::new_in(*CHECK, VariantType::String),
        ]
    }

    fn bind_port(&mut self, key: Symbol, binding: PortBinding) -> Result<(), BindError> {
        if key == *INPUT {
            match binding {
                PortBinding::Input(ParamBinding::Variable(var)) | PortBinding::InOut(var) => {
                    self.input = Some(var);
                    Ok(())
                }
                PortBinding::Input(ParamBinding::Literal(_)) => {
                    Err(BindError::LiteralOutput(key.to_string()))
                }
                PortBinding::Output(_) => Err(BindError::WrongDirection(key.to_string())),
            }
        } else if key == *VALUE {
            match binding {
                PortBinding::Input(binding) => {
                    self.value = binding;
                    Ok(())
                }
                _ => Err(BindError::WrongDirection(key.to_string())),
            }
        } else if key == *CHECK {
            let PortBinding::Input(ParamBinding::Literal(Variant::String(ref s))) = binding else {
                return Err(BindError::WrongDirection(key.to_string()));
            };
            self.check = CheckType::parse(s).ok_or_else(|| BindError::InvalidValue {
                port: key.to_string(),
                value: s.clone(),
            })?;
            Ok(())
        } else {
            Err(BindError::UnknownPort(key.to_string()))
        }
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        let Some(lhs) = self.input.and_then(|key| ctx.blackboard().get(key)) else {
            return BehaviorResult::Failure;
        };
        let rhs = resolve_raw(&self.value, ctx.blackboard()).unwrap_or_default();
        if self.check.compare(&lhs, &rhs) {
            BehaviorResult::Success
        } else {
            BehaviorResult::Failure
        }
    }
}

static TICKS: Lazy<Symbol> = Lazy::new(|| "ticks".into());

/// Reports running for `ticks` ticks, then succeeds.
#[derive(Clone, Default)]
pub struct Wait {
    ticks: BBInt,
    elapsed: i64,
}

impl Wait {
    pub fn new(ticks: i64) -> Self {
        Self {
            ticks: BBInt::literal(ticks),
            elapsed: 0,
        }
    }
}

impl<A: Agent> Task<A> for Wait {
    fn provided_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::new_in(*TICKS, VariantType::Int)]
    }

    fn bind_port(&mut self, key: Symbol, binding: PortBinding) -> Result<(), BindError> {
        if key != *TICKS {
            return Err(BindError::UnknownPort(key.to_string()));
        }
        bind_input(self.ticks.param_mut(), key, binding)
    }

    fn reset(&mut self) {
        self.elapsed = 0;
    }

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
        let ticks = self.ticks.resolve(ctx.agent(), ctx.blackboard(), 0);
        if self.elapsed >= ticks {
            self.elapsed = 0;
            return BehaviorResult::Success;
        }
        self.elapsed += 1;
        BehaviorResult::Running
    }
}

/// Always succeeds.
#[derive(Clone, Default)]
pub struct Succeed;

impl<A: Agent> Task<A> for Succeed {
    fn tick(&mut self, _ctx: &mut TaskContext<A>) -> BehaviorResult {
        BehaviorResult::Success
    }
}

/// Always fails.
#[derive(Clone, Default)]
pub struct Fail;

impl<A: Agent> Task<A> for Fail {
    fn tick(&mut self, _ctx: &mut TaskContext<A>) -> BehaviorResult {
        BehaviorResult::Failure
    }
}
