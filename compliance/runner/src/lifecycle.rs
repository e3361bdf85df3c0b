// Licensed under the Apache-2.0 license

//! Order of the adapter calls. Each call fires one event; an event that is
//! not valid in the current state is rejected.

use smlang::statemachine;

statemachine! {
    derive_states: [Debug, Clone],
    derive_events: [Clone, Debug],
    transitions: {
        *Constructed + Initialise = Initialised,
        Initialised + Build = Built,
        Built + RunTests = Running,
        Running + Finish = Done,
        Running + SkipTargetRun = AbortedNoRun
    }
}

pub struct Lifecycle;

impl StateMachineContext for Lifecycle {}

pub fn new() -> StateMachine<Lifecycle> {
    StateMachine::new(Lifecycle)
}
