use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use miette::Diagnostic;
use thiserror::Error;

use crate::ops::{Instruction, InstructionSet, INSTRUCTION_SIZE};
use crate::port::{InputPort, OutputPort, StdInput, StdOutput};

/// Content of a memory cell, the accumulator, or an operand.
pub type Word = i64;

/// Index of a memory cell.
pub type Address = usize;

/// Capacity used when nothing else is configured.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Anomaly raised while executing a program. Distinct from a normal `halt`.
#[derive(Debug, Error, Diagnostic, PartialEq)]
pub enum ExecutionError {
    #[error("Address {address} is outside of memory [0, {capacity})")]
    #[diagnostic(
        code(exec::address_out_of_range),
        help("check the operands of the instruction at the current instruction pointer")
    )]
    AddressOutOfRange { address: Word, capacity: usize },

    #[error("Arithmetic overflow in instruction at address {address}")]
    #[diagnostic(code(exec::overflow))]
    Overflow { address: Address },

    #[error("Unable to read input: {reason}")]
    #[diagnostic(code(exec::input))]
    Input { reason: String },

    #[error("Unable to write output: {reason}")]
    #[diagnostic(code(exec::output))]
    Output { reason: String },
}

/// Receives memory and CPU events, synchronously and in execution order.
pub trait Observer {
    fn on_read(&mut self, _address: Address, _value: Word) {}
    fn on_write(&mut self, _address: Address, _value: Word) {}
    /// One instruction, found at `address`, is about to execute.
    fn on_tick(&mut self, _address: Address, _cost: u64) {}
}

/// Shared handle to an observer. The caller keeps its own clone to read results.
pub type ObserverHandle = Rc<RefCell<dyn Observer>>;

#[derive(Default)]
struct Observers(Vec<ObserverHandle>);

impl Observers {
    fn attach(&mut self, observer: ObserverHandle) {
        self.0.push(observer);
    }

    fn detach(&mut self, observer: &ObserverHandle) -> bool {
        let initial_len = self.0.len();
        self.0.retain(|each| !Rc::ptr_eq(each, observer));
        initial_len != self.0.len()
    }

    fn notify(&self, event: impl Fn(&mut dyn Observer)) {
        for observer in &self.0 {
            event(&mut *observer.borrow_mut());
        }
    }
}

/// Flat array of cells, all starting at zero.
pub struct Memory {
    cells: Vec<Word>,
    observers: Observers,
}

impl Memory {
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![0; capacity],
            observers: Observers::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn attach(&mut self, observer: ObserverHandle) {
        self.observers.attach(observer);
    }

    pub fn detach(&mut self, observer: &ObserverHandle) -> bool {
        self.observers.detach(observer)
    }

    /// Interpret a word as an address in this memory.
    pub fn address(&self, value: Word) -> Result<Address, ExecutionError> {
        usize::try_from(value)
            .ok()
            .filter(|address| *address < self.capacity())
            .ok_or(ExecutionError::AddressOutOfRange {
                address: value,
                capacity: self.capacity(),
            })
    }

    pub fn read(&self, address: Address) -> Result<Word, ExecutionError> {
        let value = *self.cell(address)?;
        self.observers.notify(|observer| observer.on_read(address, value));
        Ok(value)
    }

    pub fn write(&mut self, address: Address, value: Word) -> Result<(), ExecutionError> {
        *self.cell_mut(address)? = value;
        self.observers.notify(|observer| observer.on_write(address, value));
        Ok(())
    }

    /// Read without notifying observers. Used for inspection only.
    pub fn peek(&self, address: Address) -> Option<Word> {
        self.cells.get(address).copied()
    }

    /// Write each instruction in turn, from address `0`.
    pub fn load_program(&mut self, instructions: &[Instruction]) -> Result<(), ExecutionError> {
        for (index, instruction) in instructions.iter().enumerate() {
            let [opcode, operand] = instruction.encode();
            let address = index * INSTRUCTION_SIZE;
            self.write(address, opcode)?;
            self.write(address + 1, operand)?;
        }
        Ok(())
    }

    fn out_of_range(&self, address: Address) -> ExecutionError {
        ExecutionError::AddressOutOfRange {
            address: Word::try_from(address).unwrap_or(Word::MAX),
            capacity: self.capacity(),
        }
    }

    fn cell(&self, address: Address) -> Result<&Word, ExecutionError> {
        self.cells
            .get(address)
            .ok_or_else(|| self.out_of_range(address))
    }

    fn cell_mut(&mut self, address: Address) -> Result<&mut Word, ExecutionError> {
        let error = self.out_of_range(address);
        self.cells.get_mut(address).ok_or(error)
    }
}

/// Accumulator and instruction pointer.
#[derive(Default)]
pub struct Cpu {
    pub accumulator: Word,
    pub instruction_pointer: Address,
    observers: Observers,
}

impl Cpu {
    pub fn attach(&mut self, observer: ObserverHandle) {
        self.observers.attach(observer);
    }

    pub fn detach(&mut self, observer: &ObserverHandle) -> bool {
        self.observers.detach(observer)
    }

    pub fn tick(&self, cost: u64) {
        let address = self.instruction_pointer;
        self.observers.notify(|observer| observer.on_tick(address, cost));
    }

    fn advance(&mut self) {
        self.instruction_pointer += INSTRUCTION_SIZE;
    }
}

impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ACC={} IP={}]",
            self.accumulator, self.instruction_pointer
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Status {
    #[default]
    Running,
    Halted,
}

/// The complete machine: memory, CPU, instruction set and I/O ports.
pub struct Machine<I = StdInput, O = StdOutput> {
    memory: Memory,
    cpu: Cpu,
    instructions: InstructionSet,
    input: I,
    output: O,
    status: Status,
}

impl Machine {
    /// Machine attached to the process' standard input and output.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity, StdInput::new(), StdOutput)
    }
}

impl<I: InputPort, O: OutputPort> Machine<I, O> {
    pub fn new(capacity: usize, input: I, output: O) -> Self {
        Self {
            memory: Memory::new(capacity),
            cpu: Cpu::default(),
            instructions: InstructionSet::default(),
            input,
            output,
            status: Status::default(),
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn instructions(&self) -> &InstructionSet {
        &self.instructions
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_halted(&self) -> bool {
        self.status == Status::Halted
    }

    pub fn halt(&mut self) {
        self.status = Status::Halted;
    }

    /// Let a halted machine execute again, from the current instruction pointer.
    pub fn resume(&mut self) {
        self.status = Status::Running;
    }

    /// Register an observer on both memory and CPU.
    pub fn attach(&mut self, observer: ObserverHandle) {
        self.memory.attach(observer.clone());
        self.cpu.attach(observer);
    }

    pub fn detach(&mut self, observer: &ObserverHandle) -> bool {
        let from_memory = self.memory.detach(observer);
        let from_cpu = self.cpu.detach(observer);
        from_memory || from_cpu
    }

    /// Instruction at the instruction pointer, decoded without notifying observers.
    pub fn next_instruction(&self) -> Option<Instruction> {
        self.instructions
            .peek_from(&self.memory, self.cpu.instruction_pointer)
    }

    /// Execute until `halt`.
    pub fn run(&mut self) -> Result<(), ExecutionError> {
        self.status = Status::Running;
        while !self.is_halted() {
            self.run_one_cycle()?;
        }
        Ok(())
    }

    /// Fetch, decode and execute one instruction. Returns the executed instruction.
    pub fn run_one_cycle(&mut self) -> Result<Instruction, ExecutionError> {
        let address = self.cpu.instruction_pointer;
        let instruction = self.instructions.read_from(&self.memory, address)?;
        log::debug!("{} {}", instruction, self.cpu);
        self.cpu.tick(instruction.cost());
        self.execute(instruction)?;
        Ok(instruction)
    }

    fn execute(&mut self, instruction: Instruction) -> Result<(), ExecutionError> {
        let address = self.cpu.instruction_pointer;
        match instruction {
            Instruction::Print(operand) => {
                let value = self.memory.read(self.memory.address(operand)?)?;
                self.output.write(value)?;
                self.cpu.advance();
            }
            Instruction::Read(operand) => {
                let target = self.memory.address(operand)?;
                let value = self.input.read()?;
                self.memory.write(target, value)?;
                self.cpu.advance();
            }
            Instruction::Add(operand) => {
                let value = self.memory.read(self.memory.address(operand)?)?;
                self.cpu.accumulator = self
                    .cpu
                    .accumulator
                    .checked_add(value)
                    .ok_or(ExecutionError::Overflow { address })?;
                self.cpu.advance();
            }
            Instruction::Store(operand) => {
                let target = self.memory.address(operand)?;
                self.memory.write(target, self.cpu.accumulator)?;
                self.cpu.advance();
            }
            Instruction::Subtract(operand) => {
                let value = self.memory.read(self.memory.address(operand)?)?;
                self.cpu.accumulator = self
                    .cpu
                    .accumulator
                    .checked_sub(value)
                    .ok_or(ExecutionError::Overflow { address })?;
                self.cpu.advance();
            }
            Instruction::JumpIfNonNegative(operand) => {
                // Zero takes the jump as well
                if self.cpu.accumulator >= 0 {
                    self.cpu.instruction_pointer = self.memory.address(operand)?;
                } else {
                    self.cpu.advance();
                }
            }
            Instruction::Halt => {
                self.halt();
                self.cpu.advance();
            }
            Instruction::Load(constant) => {
                self.cpu.accumulator = constant;
                self.cpu.advance();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ScriptedInput;
    use Instruction::*;

    fn machine(inputs: &[Word]) -> Machine<ScriptedInput, Vec<Word>> {
        Machine::new(DEFAULT_CAPACITY, ScriptedInput::new(inputs.to_vec()), Vec::new())
    }

    fn run(machine: &mut Machine<ScriptedInput, Vec<Word>>, program: &[Instruction]) {
        machine.memory_mut().load_program(program).unwrap();
        machine.run().unwrap();
    }

    #[test]
    fn prints_an_address() {
        let mut machine = machine(&[]);
        machine.memory_mut().write(10, 25).unwrap();
        run(&mut machine, &[Print(10)]);
        assert_eq!(machine.output(), &vec![25]);
    }

    #[test]
    fn reads_a_value() {
        let mut machine = machine(&[34]);
        run(&mut machine, &[Read(10), Print(10)]);
        assert_eq!(machine.output().last(), Some(&34));
    }

    #[test]
    fn adds_and_subtracts() {
        let mut machine = machine(&[34, 27]);
        run(
            &mut machine,
            &[Read(50), Read(51), Add(50), Subtract(51), Store(52), Print(52)],
        );
        assert_eq!(machine.output(), &vec![34 - 27]);

        let mut machine = self::machine(&[34, 27, 11]);
        run(
            &mut machine,
            &[Read(50), Read(51), Read(52), Add(50), Add(51), Add(52), Store(53), Print(53)],
        );
        assert_eq!(machine.output(), &vec![34 + 27 + 11]);
    }

    #[test]
    fn jumps_if_non_negative() {
        let mut machine = machine(&[34, 27]);
        run(
            &mut machine,
            &[Read(50), Read(51), Add(50), JumpIfNonNegative(10), Print(50), Print(51)],
        );
        assert_eq!(machine.output(), &vec![27]);
    }

    #[test]
    fn jumps_when_accumulator_is_zero() {
        let mut machine = machine(&[]);
        run(&mut machine, &[Load(0), JumpIfNonNegative(6), Print(50), Halt]);
        assert!(machine.output().is_empty());
        assert_eq!(machine.cpu().instruction_pointer, 8);
    }

    #[test]
    fn falls_through_when_negative() {
        let mut machine = machine(&[]);
        run(&mut machine, &[Load(-1), JumpIfNonNegative(6), Print(50), Halt]);
        assert_eq!(machine.output(), &vec![0]);
    }

    #[test]
    fn halts() {
        let mut machine = machine(&[34, 27]);
        run(
            &mut machine,
            &[Read(50), Read(51), Halt, Print(50), Print(51)],
        );
        assert!(machine.output().is_empty());
        assert!(machine.is_halted());
        assert_eq!(machine.cpu().instruction_pointer, 6);
    }

    #[test]
    fn loads_the_operand_itself() {
        let mut machine = machine(&[]);
        run(&mut machine, &[Load(122), Store(51), Print(51)]);
        assert_eq!(machine.output(), &vec![122]);
        assert_eq!(machine.cpu().accumulator, 122);
    }

    #[test]
    fn empty_memory_halts_immediately() {
        let mut machine = machine(&[]);
        machine.run().unwrap();
        assert!(machine.is_halted());
        assert_eq!(machine.cpu().instruction_pointer, 2);
    }

    #[test]
    fn out_of_range_operand_is_an_error() {
        let mut machine = Machine::new(8, ScriptedInput::new(vec![]), Vec::new());
        machine.memory_mut().load_program(&[Print(8)]).unwrap();
        assert_eq!(
            machine.run(),
            Err(ExecutionError::AddressOutOfRange {
                address: 8,
                capacity: 8
            })
        );
        assert!(!machine.is_halted());
        assert_eq!(machine.cpu().instruction_pointer, 0);

        let mut machine = Machine::new(8, ScriptedInput::new(vec![]), Vec::new());
        machine.memory_mut().load_program(&[Store(-1)]).unwrap();
        assert!(matches!(
            machine.run(),
            Err(ExecutionError::AddressOutOfRange { address: -1, .. })
        ));
    }

    #[test]
    fn running_off_the_end_of_memory_is_an_error() {
        let mut machine = Machine::new(4, ScriptedInput::new(vec![]), Vec::new());
        machine
            .memory_mut()
            .load_program(&[Load(1), JumpIfNonNegative(4)])
            .unwrap();
        assert!(matches!(
            machine.run(),
            Err(ExecutionError::AddressOutOfRange { .. })
        ));
    }

    #[test]
    fn overflow_is_an_error() {
        let mut machine = machine(&[]);
        machine.memory_mut().write(50, Word::MAX).unwrap();
        machine
            .memory_mut()
            .load_program(&[Load(1), Add(50), Halt])
            .unwrap();
        assert_eq!(machine.run(), Err(ExecutionError::Overflow { address: 2 }));
        assert_eq!(machine.cpu().accumulator, 1);
    }

    #[test]
    fn detached_observer_receives_nothing() {
        #[derive(Default)]
        struct Counter(usize);
        impl Observer for Counter {
            fn on_tick(&mut self, _address: Address, _cost: u64) {
                self.0 += 1;
            }
        }

        let counter = Rc::new(RefCell::new(Counter::default()));
        let handle: ObserverHandle = counter.clone();
        let mut machine = machine(&[]);
        machine.attach(handle.clone());
        machine.memory_mut().load_program(&[Load(1), Halt]).unwrap();
        machine.run().unwrap();
        assert_eq!(counter.borrow().0, 2);

        assert!(machine.detach(&handle));
        assert!(!machine.detach(&handle));
        machine.cpu_mut().instruction_pointer = 0;
        machine.run().unwrap();
        assert_eq!(counter.borrow().0, 2);
    }
}
