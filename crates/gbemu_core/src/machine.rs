use crate::cpu::{Bus, Cpu};

/// A CPU together with the store it executes from.
///
/// The CPU itself borrows its memory one `step` at a time; this composition
/// owns both halves so hosts can hold a single value and drive it. Any
/// byte-addressable store works, including a [`crate::Mmu`].
pub struct Machine<B: Bus> {
    pub cpu: Cpu,
    pub bus: B,
}

impl<B: Bus> Machine<B> {
    pub fn new(bus: B) -> Self {
        Self {
            cpu: Cpu::new(),
            bus,
        }
    }

    /// Execute a single instruction.
    pub fn step(&mut self) {
        self.cpu.step(&mut self.bus);
    }

    /// Step until the CPU executes STOP.
    ///
    /// The loop has no other bound; a program that never stops runs forever,
    /// which matches the reference front-end's behavior. Hosts that need a
    /// budget should call `step` themselves.
    pub fn run_to_stop(&mut self) {
        while !self.cpu.is_stopped() {
            self.step();
        }
    }
}
