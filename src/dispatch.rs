//! The three dispatch strategies under measurement and their workload driver.
//!
//! Each strategy builds the same logical object (a no-op plus an accumulating
//! setter) and differs only in how a call reaches the code that handles it:
//!
//! - [`VirtualDispatch`]: trait objects behind `Box<dyn Accumulator>`.
//! - [`ClosureDispatch`]: boxed closures stored on the object.
//! - [`MessageDispatch`]: an object composed of mixins at runtime, where each
//!   call looks up the implementing mixin by message id.

use std::{cell::Cell, hint::black_box, rc::Rc};

use ahash::AHashMap;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::{
    BenchError,
    registry::{CaseOptions, SuiteRegistry},
    workload::{Operation, Workload},
};

pub trait Accumulator {
    fn noop(&self);
    fn add(&mut self, value: u32);
    fn sum(&self) -> u32;
}

struct PlainSum {
    total: u32,
}

impl Accumulator for PlainSum {
    fn noop(&self) {}

    fn add(&mut self, value: u32) {
        self.total = self.total.wrapping_add(value);
    }

    fn sum(&self) -> u32 {
        self.total
    }
}

// Second implementation so call sites stay polymorphic.
struct SplitSum {
    low: u32,
    high: u32,
}

impl Accumulator for SplitSum {
    fn noop(&self) {}

    fn add(&mut self, value: u32) {
        self.low = self.low.wrapping_add(value & 0xFFFF);
        self.high = self.high.wrapping_add(value & 0xFFFF_0000);
    }

    fn sum(&self) -> u32 {
        self.low.wrapping_add(self.high)
    }
}

pub fn new_accumulator(seed: u32) -> Box<dyn Accumulator> {
    if seed % 2 == 0 {
        Box::new(PlainSum { total: 0 })
    } else {
        Box::new(SplitSum { low: 0, high: 0 })
    }
}

/// Object whose operations are stored callables over shared state.
pub struct ClosureObject {
    noop: Box<dyn Fn()>,
    add: Box<dyn Fn(u32)>,
    sum: Box<dyn Fn() -> u32>,
}

impl ClosureObject {
    pub fn noop(&self) {
        (self.noop)()
    }

    pub fn add(&self, value: u32) {
        (self.add)(value)
    }

    pub fn sum(&self) -> u32 {
        (self.sum)()
    }
}

pub fn new_closure_object(seed: u32) -> ClosureObject {
    let total = Rc::new(Cell::new(0u32));
    let add: Box<dyn Fn(u32)> = if seed % 2 == 0 {
        let total = Rc::clone(&total);
        Box::new(move |value| total.set(total.get().wrapping_add(value)))
    } else {
        let total = Rc::clone(&total);
        Box::new(move |value| {
            let low = value & 0xFFFF;
            total.set(total.get().wrapping_add(low).wrapping_add(value - low))
        })
    };
    ClosureObject {
        noop: Box::new(|| {}),
        add,
        sum: Box::new(move || total.get()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(u16);

impl MessageId {
    pub const NOOP: MessageId = MessageId(0);
    pub const ADD: MessageId = MessageId(1);
    pub const SUM: MessageId = MessageId(2);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    Noop,
    Add(u32),
    Sum,
}

impl Message {
    pub fn id(&self) -> MessageId {
        match self {
            Message::Noop => MessageId::NOOP,
            Message::Add(_) => MessageId::ADD,
            Message::Sum => MessageId::SUM,
        }
    }
}

/// A unit of behavior that can be composed into an [`Object`].
pub trait Mixin {
    fn name(&self) -> &'static str;
    fn messages(&self) -> &'static [MessageId];
    fn handle(&mut self, message: Message) -> u32;
}

pub struct IdleMixin;

impl Mixin for IdleMixin {
    fn name(&self) -> &'static str {
        "idle"
    }

    fn messages(&self) -> &'static [MessageId] {
        &[MessageId::NOOP]
    }

    fn handle(&mut self, _message: Message) -> u32 {
        0
    }
}

pub struct CounterMixin {
    total: u32,
}

impl CounterMixin {
    pub fn new(start: u32) -> Self {
        Self { total: start }
    }
}

impl Mixin for CounterMixin {
    fn name(&self) -> &'static str {
        "counter"
    }

    fn messages(&self) -> &'static [MessageId] {
        &[MessageId::ADD, MessageId::SUM]
    }

    fn handle(&mut self, message: Message) -> u32 {
        match message {
            Message::Add(value) => {
                self.total = self.total.wrapping_add(value);
                self.total
            }
            Message::Sum | Message::Noop => self.total,
        }
    }
}

/// Composed object. Every message has at most one implementing mixin.
#[derive(Default)]
pub struct Object {
    mixins: Vec<Box<dyn Mixin>>,
    dispatch: AHashMap<MessageId, usize>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mixin(mut self, mixin: Box<dyn Mixin>) -> Result<Self, BenchError> {
        let slot = self.mixins.len();
        for id in mixin.messages() {
            if let Some(existing) = self.dispatch.get(id) {
                return Err(BenchError::invalid_input(format!(
                    "message {id:?} already implemented by mixin {}",
                    self.mixins[*existing].name()
                )));
            }
        }
        for id in mixin.messages() {
            self.dispatch.insert(*id, slot);
        }
        self.mixins.push(mixin);
        Ok(self)
    }

    pub fn implements(&self, id: MessageId) -> bool {
        self.dispatch.contains_key(&id)
    }

    pub fn send(&mut self, message: Message) -> Result<u32, BenchError> {
        let slot = *self.dispatch.get(&message.id()).ok_or_else(|| {
            BenchError::case_execution(format!("no mixin implements {:?}", message.id()))
        })?;
        Ok(self.mixins[slot].handle(message))
    }
}

/// Composes an idle + counter object. The seed picks the mixin order, so
/// dispatch slots differ between instances.
pub fn new_object(seed: u32) -> Result<Object, BenchError> {
    let idle: Box<dyn Mixin> = Box::new(IdleMixin);
    let counter: Box<dyn Mixin> = Box::new(CounterMixin::new(0));
    if seed % 2 == 0 {
        Object::new().with_mixin(idle)?.with_mixin(counter)
    } else {
        Object::new().with_mixin(counter)?.with_mixin(idle)
    }
}

/// Construct/invoke/destroy capability shared by the three strategies.
pub trait DispatchAdapter {
    type Handle;

    fn construct(seed: u32) -> Result<Self::Handle, BenchError>;
    fn noop(handle: &mut Self::Handle) -> Result<(), BenchError>;
    fn add(handle: &mut Self::Handle, value: u32) -> Result<(), BenchError>;
    fn sum(handle: &mut Self::Handle) -> Result<u32, BenchError>;

    fn destroy(handle: Self::Handle) {
        drop(handle);
    }
}

pub struct VirtualDispatch;

impl DispatchAdapter for VirtualDispatch {
    type Handle = Box<dyn Accumulator>;

    fn construct(seed: u32) -> Result<Self::Handle, BenchError> {
        Ok(new_accumulator(seed))
    }

    fn noop(handle: &mut Self::Handle) -> Result<(), BenchError> {
        handle.noop();
        Ok(())
    }

    fn add(handle: &mut Self::Handle, value: u32) -> Result<(), BenchError> {
        handle.add(value);
        Ok(())
    }

    fn sum(handle: &mut Self::Handle) -> Result<u32, BenchError> {
        Ok(handle.sum())
    }
}

pub struct ClosureDispatch;

impl DispatchAdapter for ClosureDispatch {
    type Handle = ClosureObject;

    fn construct(seed: u32) -> Result<Self::Handle, BenchError> {
        Ok(new_closure_object(seed))
    }

    fn noop(handle: &mut Self::Handle) -> Result<(), BenchError> {
        handle.noop();
        Ok(())
    }

    fn add(handle: &mut Self::Handle, value: u32) -> Result<(), BenchError> {
        handle.add(value);
        Ok(())
    }

    fn sum(handle: &mut Self::Handle) -> Result<u32, BenchError> {
        Ok(handle.sum())
    }
}

pub struct MessageDispatch;

impl DispatchAdapter for MessageDispatch {
    type Handle = Object;

    fn construct(seed: u32) -> Result<Self::Handle, BenchError> {
        new_object(seed)
    }

    fn noop(handle: &mut Self::Handle) -> Result<(), BenchError> {
        handle.send(Message::Noop).map(|_| ())
    }

    fn add(handle: &mut Self::Handle, value: u32) -> Result<(), BenchError> {
        handle.send(Message::Add(value)).map(|_| ())
    }

    fn sum(handle: &mut Self::Handle) -> Result<u32, BenchError> {
        handle.send(Message::Sum)
    }
}

/// Workload that drives one adapter over one operation.
///
/// Setup builds one instance per iteration (plus the setter's inputs), the
/// body touches instance `index`, and teardown checks that the setter's
/// instances accumulated exactly the inputs they were given.
pub struct DispatchWorkload<A: DispatchAdapter> {
    operation: Operation,
    rng: StdRng,
    handles: Vec<A::Handle>,
    inputs: Vec<u32>,
}

impl<A: DispatchAdapter> DispatchWorkload<A> {
    pub fn new(operation: Operation) -> Self {
        Self::with_rng(operation, StdRng::from_entropy())
    }

    pub fn seeded(operation: Operation, seed: u64) -> Self {
        Self::with_rng(operation, StdRng::seed_from_u64(seed))
    }

    fn with_rng(operation: Operation, rng: StdRng) -> Self {
        Self {
            operation,
            rng,
            handles: Vec::new(),
            inputs: Vec::new(),
        }
    }

    pub fn instances(&self) -> usize {
        self.handles.len()
    }

    /// Setter inputs drawn by the last setup, one per instance.
    pub fn inputs(&self) -> &[u32] {
        &self.inputs
    }

    fn verify_sums(&mut self) -> Result<(), BenchError> {
        let mut expected = 0u32;
        let mut actual = 0u32;
        for (handle, input) in self.handles.iter_mut().zip(&self.inputs) {
            expected = expected.wrapping_add(*input);
            actual = actual.wrapping_add(A::sum(handle)?);
        }
        if expected != actual {
            return Err(BenchError::teardown(format!(
                "setter sums diverged: inputs={expected} instances={actual}"
            )));
        }
        Ok(())
    }
}

impl<A: DispatchAdapter> Workload for DispatchWorkload<A> {
    fn setup(&mut self, iterations: usize) -> Result<(), BenchError> {
        self.handles.clear();
        self.handles.reserve(iterations);
        for _ in 0..iterations {
            let seed = self.rng.r#gen::<u32>();
            self.handles.push(A::construct(seed)?);
        }
        self.inputs.clear();
        if self.operation == Operation::Setter {
            self.inputs.reserve(iterations);
            for _ in 0..iterations {
                self.inputs.push(self.rng.r#gen::<u32>());
            }
        }
        Ok(())
    }

    fn invoke(&mut self, index: usize) -> Result<(), BenchError> {
        let handle = self
            .handles
            .get_mut(index)
            .ok_or_else(|| BenchError::case_execution(format!("no instance at {index}")))?;
        match self.operation {
            Operation::Noop => A::noop(black_box(handle)),
            Operation::Setter => A::add(black_box(handle), black_box(self.inputs[index])),
        }
    }

    fn teardown(&mut self) -> Result<(), BenchError> {
        let verified = match self.operation {
            Operation::Setter => self.verify_sums(),
            Operation::Noop => Ok(()),
        };
        for handle in self.handles.drain(..) {
            A::destroy(handle);
        }
        self.inputs.clear();
        verified
    }
}

/// Strategy tag selected when a case is registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchStrategy {
    Virtual,
    Closure,
    Message,
}

impl DispatchStrategy {
    pub const ALL: [DispatchStrategy; 3] = [
        DispatchStrategy::Virtual,
        DispatchStrategy::Closure,
        DispatchStrategy::Message,
    ];

    /// Prefix used in case names.
    pub fn prefix(&self) -> &'static str {
        match self {
            DispatchStrategy::Virtual => "virtual",
            DispatchStrategy::Closure => "std_func",
            DispatchStrategy::Message => "msg",
        }
    }

    pub fn case_name(&self, operation: Operation) -> String {
        format!("{}_{}", self.prefix(), operation)
    }

    pub fn workload(&self, operation: Operation) -> Box<dyn Workload> {
        match self {
            DispatchStrategy::Virtual => {
                Box::new(DispatchWorkload::<VirtualDispatch>::new(operation))
            }
            DispatchStrategy::Closure => {
                Box::new(DispatchWorkload::<ClosureDispatch>::new(operation))
            }
            DispatchStrategy::Message => {
                Box::new(DispatchWorkload::<MessageDispatch>::new(operation))
            }
        }
    }
}

/// Registers the "noop" and "setter" suites, each with one case per strategy
/// and the closure case as the comparison baseline.
pub fn register_dispatch_suites(registry: &mut SuiteRegistry) -> Result<(), BenchError> {
    for operation in [Operation::Noop, Operation::Setter] {
        let suite = operation.as_str();
        for strategy in DispatchStrategy::ALL {
            let case = strategy.case_name(operation);
            registry.register_case(
                suite,
                &case,
                move || strategy.workload(operation),
                CaseOptions::default(),
            )?;
        }
        registry.mark_as_baseline(suite, &DispatchStrategy::Closure.case_name(operation))?;
        debug!(suite, "registered dispatch suite");
    }
    Ok(())
}
