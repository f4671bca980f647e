use std::collections::HashMap;

use crate::{
    tasks::{
        CheckVar, Fail, ForceFailure, ForceSuccess, If, Inverter, IsTrue, NewScope, Parallel,
        ReactiveSelector, ReactiveSequence, Repeat, RepeatUntilFailure, Retry, Selector, Sequence,
        SetBool, SetVar, Succeed, Wait,
    },
    Agent, Task,
};

pub type Constructor<A> = Box<dyn Fn() -> Box<dyn Task<A>>>;

pub fn boxify<A, T>(cons: impl (Fn() -> T) + 'static) -> Constructor<A>
where
    T: Task<A> + 'static,
{
    Box::new(move || Box::new(cons()))
}

/// Maps task type names, as written in template sources, to constructors.
pub struct Registry<A> {
    task_types: HashMap<String, Constructor<A>>,
}

impl<A: Agent> Default for Registry<A> {
    /// A registry with every built-in task, under its type name. `if` and
    /// the `Fallback` aliases are the names the DSL desugars to.
    fn default() -> Self {
        let mut ret = Self::empty();
        ret.register("Sequence", boxify(Sequence::default));
        ret.register("Selector", boxify(Selector::default));
        ret.register("Fallback", boxify(Selector::default));
        ret.register("ReactiveSequence", boxify(ReactiveSequence::default));
        ret.register("ReactiveSelector", boxify(ReactiveSelector::default));
        ret.register("ReactiveFallback", boxify(ReactiveSelector::default));
        ret.register("Parallel", boxify(Parallel::default));
        ret.register("if", boxify(If::default));
        ret.register("Inverter", boxify(|| Inverter));
        ret.register("ForceSuccess", boxify(|| ForceSuccess));
        ret.register("ForceFailure", boxify(|| ForceFailure));
        ret.register("Repeat", boxify(Repeat::default));
        ret.register("Retry", boxify(Retry::default));
        ret.register("RepeatUntilFailure", boxify(|| RepeatUntilFailure));
        ret.register("NewScope", boxify(NewScope::default));
        ret.register("SetBool", boxify(SetBool::default));
        ret.register("SetVar", boxify(SetVar::default));
        ret.register("IsTrue", boxify(IsTrue::default));
        ret.register("CheckVar", boxify(CheckVar::default));
        ret.register("Wait", boxify(Wait::default));
        ret.register("Succeed", boxify(|| Succeed));
        ret.register("Fail", boxify(|| Fail));
        ret
    }
}

impl<A> Registry<A> {
    /// A registry without any task type, not even the built-ins.
    pub fn empty() -> Self {
        Self {
            task_types: HashMap::new(),
        }
    }

    pub fn register(&mut self, type_name: impl ToString, constructor: Constructor<A>) {
        self.task_types.insert(type_name.to_string(), constructor);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.task_types.contains_key(type_name)
    }

    pub fn build(&self, type_name: &str) -> Option<Box<dyn Task<A>>> {
        self.task_types
            .get(type_name)
            .map(|constructor| constructor())
    }
}
