mod breakpoint;
mod command;
mod error;
mod parse;
mod reader;
mod view;

pub use self::breakpoint::Breakpoints;
pub use self::command::{Command, CommandName, Target};
pub use self::error::{ArgumentError, CommandError, DebugError, ValueError};
pub use self::reader::{CommandReader, Line, PROMPT};
pub use self::view::{BreakpointView, CellView, CpuView, DebugView, SourceLine};

use crate::port::{InputPort, OutputPort, StdInput, StdOutput};
use crate::runtime::{Address, Machine, Word};
use crate::symbol::ProgramMap;

/// Text of the `help` command.
pub const HELP: &str = include_str!("./help.txt");

/// Lines shown around the current one by `show source`.
const SOURCE_WINDOW: usize = 10;

/// What the session loop does after a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Proceed,
    Quit,
}

/// Supervises a machine: breakpoints, stepping, and inspection.
///
/// The machine is borrowed for the whole session. The program map and the source are optional;
/// commands which need them report an error when they are missing.
pub struct Debugger<'m, V, I = StdInput, O = StdOutput> {
    machine: &'m mut Machine<I, O>,
    map: Option<ProgramMap>,
    source: Option<Vec<String>>,
    breakpoints: Breakpoints,
    view: V,
}

impl<'m, V: DebugView, I: InputPort, O: OutputPort> Debugger<'m, V, I, O> {
    pub fn new(machine: &'m mut Machine<I, O>, view: V) -> Self {
        Self {
            machine,
            map: None,
            source: None,
            breakpoints: Breakpoints::new(),
            view,
        }
    }

    pub fn with_map(mut self, map: Option<ProgramMap>) -> Self {
        self.map = map;
        self
    }

    pub fn with_source(mut self, source: Option<&str>) -> Self {
        self.source = source.map(|source| source.lines().map(str::to_string).collect());
        self
    }

    pub fn machine(&self) -> &Machine<I, O> {
        self.machine
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    /// Session loop: read commands until `quit` or the end of input.
    pub fn start(&mut self, reader: &mut CommandReader) {
        self.view.show_opening();
        while let Some(Line { text, echo }) = reader.next_line() {
            let text = text.trim();
            // Necessary, since `Command::try_from` assumes non-empty line
            if text.is_empty() {
                continue;
            }
            if echo {
                self.view.show_command(text);
            }
            match Command::try_from(text) {
                Ok(command) => {
                    if self.dispatch(command) == Action::Quit {
                        break;
                    }
                }
                Err(error) => self.view.invalid_command(text, &error),
            }
        }
        self.view.show_closing();
    }

    pub fn dispatch(&mut self, command: Command) -> Action {
        match command {
            Command::Quit => return Action::Quit,
            Command::Help => self.view.show_help(),
            Command::SetInstructionPointer { address } => self.set_instruction_pointer(address),
            Command::SetAccumulator { value } => self.set_accumulator(value),
            Command::SetMemory { address, value } => self.set_memory(address, value),
            Command::Break {
                target: Target::Address(address),
            } => self.set_breakpoint(address),
            Command::Break {
                target: Target::Line(line),
            } => self.set_breakpoint_at_line(line),
            Command::Clear {
                target: Target::Address(address),
            } => self.clear_breakpoint(address),
            Command::Clear {
                target: Target::Line(line),
            } => self.clear_breakpoint_at_line(line),
            Command::Step { count } => self.step(count),
            Command::Run => self.run(),
            Command::ShowMemory { from, to } => self.show_memory(from, to),
            Command::ShowCpu => self.show_cpu(),
            Command::ShowBreakpoints => self.show_breakpoints(),
            Command::ShowSource { from, to } => self.show_source(from, to),
            Command::ShowSymbol { symbol } => self.show_symbol(&symbol),
        }
        Action::Proceed
    }

    /// Also resumes a halted machine, so that it runs from `address`.
    pub fn set_instruction_pointer(&mut self, address: Address) {
        let result = self.check_address(address).map(|address| {
            self.machine.cpu_mut().instruction_pointer = address;
            self.machine.resume();
        });
        if self.report(result).is_some() {
            self.view
                .report(&format!("Instruction pointer set to {address}"));
        }
    }

    pub fn set_accumulator(&mut self, value: Word) {
        self.machine.cpu_mut().accumulator = value;
        self.view.report(&format!("Accumulator set to {value}"));
    }

    pub fn set_memory(&mut self, address: Address, value: Word) {
        let result = self
            .machine
            .memory_mut()
            .write(address, value)
            .map_err(DebugError::from);
        if self.report(result).is_some() {
            self.view
                .report(&format!("Memory at address {address} set to {value}"));
        }
    }

    /// Execute until the machine halts, or the instruction pointer reaches a breakpoint.
    ///
    /// At least one instruction executes, so that running from a breakpoint moves on.
    pub fn run(&mut self) {
        if self.machine.is_halted() {
            self.view.show_halted();
            return;
        }
        while self.execute_one() {
            if self.machine.is_halted() {
                self.view.show_halted();
                break;
            }
            if self.at_breakpoint() {
                let address = self.machine.cpu().instruction_pointer;
                self.view
                    .report(&format!("Reached breakpoint at address {address}"));
                break;
            }
        }
        self.show_cpu();
    }

    /// Execute up to `count` instructions, stopping early on `halt` or on a breakpoint.
    pub fn step(&mut self, count: usize) {
        if self.machine.is_halted() {
            self.view.show_halted();
            return;
        }
        for _ in 0..count {
            let executed = self.execute_one();
            self.show_cpu();
            if !executed {
                break;
            }
            if self.machine.is_halted() {
                self.view.show_halted();
                break;
            }
            if self.at_breakpoint() {
                break;
            }
        }

        if self.source.is_none() {
            return;
        }
        let current_line = self
            .map
            .as_ref()
            .and_then(|map| map.find_source(self.machine.cpu().instruction_pointer).ok());
        if let Some(line) = current_line {
            self.show_source(Some(line.saturating_sub(1).max(1)), Some(line + 1));
        }
    }

    /// Returns `false` if execution failed. The error is reported.
    fn execute_one(&mut self) -> bool {
        let address = self.machine.cpu().instruction_pointer;
        if let Some(instruction) = self.machine.next_instruction() {
            self.view.show_instruction(address, &instruction);
        }
        let result = self.machine.run_one_cycle().map_err(DebugError::from);
        self.report(result).is_some()
    }

    fn at_breakpoint(&self) -> bool {
        self.breakpoints
            .contains(self.machine.cpu().instruction_pointer)
    }

    pub fn set_breakpoint(&mut self, address: Address) {
        let Some(address) = self.report(self.check_address(address)) else {
            return;
        };
        if self.breakpoints.insert(address) {
            self.view
                .report(&format!("Added breakpoint at address {address}"));
        } else {
            self.view
                .report(&format!("Breakpoint already exists at address {address}"));
        }
    }

    pub fn clear_breakpoint(&mut self, address: Address) {
        if self.breakpoints.remove(address) {
            self.view
                .report(&format!("Removed breakpoint at address {address}"));
        } else {
            self.view
                .report_error(&DebugError::NoBreakpoint { address });
        }
    }

    pub fn set_breakpoint_at_line(&mut self, line: usize) {
        if let Some(address) = self.report(self.address_of_line(line)) {
            self.set_breakpoint(address);
        }
    }

    pub fn clear_breakpoint_at_line(&mut self, line: usize) {
        if let Some(address) = self.report(self.address_of_line(line)) {
            self.clear_breakpoint(address);
        }
    }

    pub fn show_cpu(&mut self) {
        let cpu = self.machine.cpu();
        let view = CpuView {
            accumulator: cpu.accumulator,
            instruction_pointer: cpu.instruction_pointer,
            next: self.machine.next_instruction(),
        };
        self.view.show_cpu(&view);
    }

    /// Cells `from` to `to`, both included. `to` defaults to `from`.
    pub fn show_memory(&mut self, from: Address, to: Option<Address>) {
        let to = to.unwrap_or(from);
        let result = self.memory_window(from, to);
        if let Some(cells) = self.report(result) {
            self.view.show_memory(&cells);
        }
    }

    fn memory_window(&self, from: Address, to: Address) -> Result<Vec<CellView>, DebugError> {
        if to < from {
            return Err(DebugError::EmptyRange { from, to });
        }
        self.check_address(to)?;
        let memory = self.machine.memory();
        let instructions = self.machine.instructions();
        let ip = self.machine.cpu().instruction_pointer;
        Ok((from..=to)
            .map(|address| {
                let value = memory.peek(address).unwrap_or_default();
                CellView {
                    address,
                    value,
                    is_current: address == ip,
                    is_breakpoint: self.breakpoints.contains(address),
                    mnemonic: instructions.find_mnemonic(value),
                }
            })
            .collect())
    }

    /// Sorted by address.
    pub fn show_breakpoints(&mut self) {
        let memory = self.machine.memory();
        let ip = self.machine.cpu().instruction_pointer;
        let breakpoints: Vec<_> = self
            .breakpoints
            .iter()
            .map(|address| {
                let value = memory.peek(address).unwrap_or_default();
                BreakpointView {
                    address,
                    is_current: address == ip,
                    value,
                    mnemonic: self.machine.instructions().find_mnemonic(value),
                }
            })
            .collect();
        self.view.show_breakpoints(&breakpoints);
    }

    /// The two cells starting at the address of `symbol`.
    pub fn show_symbol(&mut self, symbol: &str) {
        let result = self.debug_map().and_then(|map| Ok(map.find_address(symbol)?));
        let Some(address) = self.report(result) else {
            return;
        };
        let last = self.machine.memory().capacity().saturating_sub(1);
        self.show_memory(address, Some((address + 1).min(last)));
    }

    /// Lines `from` to `to`, both included and clipped to the source.
    ///
    /// Without `from`, the window is centered on the current line. Without `to`, it spans
    /// ten lines after `from`.
    pub fn show_source(&mut self, from: Option<usize>, to: Option<usize>) {
        let result = self.source_window(from, to);
        if let Some(lines) = self.report(result) {
            self.view.show_source(&lines);
        }
    }

    fn source_window(
        &self,
        from: Option<usize>,
        to: Option<usize>,
    ) -> Result<Vec<SourceLine>, DebugError> {
        let map = self.debug_map()?;
        let source = self.source.as_ref().ok_or(DebugError::NoSource)?;
        let current = map.find_source(self.machine.cpu().instruction_pointer).ok();

        let from = from.unwrap_or_else(|| {
            current
                .unwrap_or(1)
                .saturating_sub(SOURCE_WINDOW / 2)
                .max(1)
        });
        if from == 0 || from > source.len() {
            return Err(DebugError::LineOutOfRange {
                line: from,
                count: source.len(),
            });
        }
        let to = to.unwrap_or(from + SOURCE_WINDOW).min(source.len());
        if to < from {
            return Err(DebugError::EmptyRange { from, to });
        }

        Ok((from..=to)
            .map(|number| SourceLine {
                number,
                is_current: current == Some(number),
                is_breakpoint: map
                    .find_address_by_line(number)
                    .is_ok_and(|address| self.breakpoints.contains(address)),
                text: source[number - 1].clone(),
            })
            .collect())
    }

    fn debug_map(&self) -> Result<&ProgramMap, DebugError> {
        self.map.as_ref().ok_or(DebugError::NoDebugInfo)
    }

    fn address_of_line(&self, line: usize) -> Result<Address, DebugError> {
        Ok(self.debug_map()?.find_address_by_line(line)?)
    }

    fn check_address(&self, address: Address) -> Result<Address, DebugError> {
        let capacity = self.machine.memory().capacity();
        if address < capacity {
            Ok(address)
        } else {
            Err(DebugError::AddressOutOfRange { address, capacity })
        }
    }

    /// Send the error, if any, to the view.
    fn report<T>(&mut self, result: Result<T, DebugError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                log::debug!("Debugger error: {error:?}");
                self.view.report_error(&error);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Instruction::{self, *};
    use crate::port::ScriptedInput;
    use crate::runtime::DEFAULT_CAPACITY;
    use crate::symbol::Record;

    type TestMachine = Machine<ScriptedInput, Vec<Word>>;

    #[derive(Clone, Debug, PartialEq)]
    enum Event {
        Opening,
        Closing,
        Help,
        Command(String),
        Cpu(CpuView),
        Memory(Vec<CellView>),
        Breakpoints(Vec<BreakpointView>),
        Source(Vec<SourceLine>),
        Instruction(Address, Instruction),
        Halted,
        Report(String),
        Error(String),
        InvalidCommand(String),
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
    }

    impl Recorder {
        fn last(&self, filter: impl Fn(&Event) -> bool) -> Option<&Event> {
            self.events.iter().rev().find(|event| filter(event))
        }

        fn count(&self, filter: impl Fn(&Event) -> bool) -> usize {
            self.events.iter().filter(|event| filter(event)).count()
        }
    }

    impl DebugView for Recorder {
        fn show_opening(&mut self) {
            self.events.push(Event::Opening);
        }
        fn show_closing(&mut self) {
            self.events.push(Event::Closing);
        }
        fn show_help(&mut self) {
            self.events.push(Event::Help);
        }
        fn show_command(&mut self, command: &str) {
            self.events.push(Event::Command(command.to_string()));
        }
        fn show_cpu(&mut self, cpu: &CpuView) {
            self.events.push(Event::Cpu(*cpu));
        }
        fn show_memory(&mut self, cells: &[CellView]) {
            self.events.push(Event::Memory(cells.to_vec()));
        }
        fn show_breakpoints(&mut self, breakpoints: &[BreakpointView]) {
            self.events.push(Event::Breakpoints(breakpoints.to_vec()));
        }
        fn show_source(&mut self, lines: &[SourceLine]) {
            self.events.push(Event::Source(lines.to_vec()));
        }
        fn show_instruction(&mut self, address: Address, instruction: &Instruction) {
            self.events.push(Event::Instruction(address, *instruction));
        }
        fn show_halted(&mut self) {
            self.events.push(Event::Halted);
        }
        fn report(&mut self, message: &str) {
            self.events.push(Event::Report(message.to_string()));
        }
        fn report_error(&mut self, error: &DebugError) {
            self.events.push(Event::Error(error.to_string()));
        }
        fn invalid_command(&mut self, command: &str, _error: &CommandError) {
            self.events.push(Event::InvalidCommand(command.to_string()));
        }
    }

    fn machine(program: &[Instruction], inputs: &[Word]) -> TestMachine {
        let mut machine = Machine::new(
            DEFAULT_CAPACITY,
            ScriptedInput::new(inputs.to_vec()),
            Vec::new(),
        );
        machine.memory_mut().load_program(program).unwrap();
        machine
    }

    /// Loads 2, 3, 4 and 5 in turn, then halts.
    fn loads() -> TestMachine {
        machine(&[Load(2), Load(3), Load(4), Load(5), Halt], &[])
    }

    fn cell(address: Address, value: Word, is_current: bool, is_breakpoint: bool, mnemonic: &'static str) -> CellView {
        CellView {
            address,
            value,
            is_current,
            is_breakpoint,
            mnemonic,
        }
    }

    fn memory_of(recorder: &Recorder) -> Option<&Vec<CellView>> {
        match recorder.last(|event| matches!(event, Event::Memory(_))) {
            Some(Event::Memory(cells)) => Some(cells),
            _ => None,
        }
    }

    fn breakpoints_of(recorder: &Recorder) -> Option<&Vec<BreakpointView>> {
        match recorder.last(|event| matches!(event, Event::Breakpoints(_))) {
            Some(Event::Breakpoints(breakpoints)) => Some(breakpoints),
            _ => None,
        }
    }

    fn source_of(recorder: &Recorder) -> Option<&Vec<SourceLine>> {
        match recorder.last(|event| matches!(event, Event::Source(_))) {
            Some(Event::Source(lines)) => Some(lines),
            _ => None,
        }
    }

    fn errors(recorder: &Recorder) -> Vec<String> {
        recorder
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Error(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn sets_registers_and_memory() {
        let mut machine = loads();
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.set_accumulator(2);
        debugger.set_instruction_pointer(2);
        debugger.set_memory(10, 2);
        assert!(errors(debugger.view()).is_empty());

        assert_eq!(machine.cpu().accumulator, 2);
        assert_eq!(machine.cpu().instruction_pointer, 2);
        assert_eq!(machine.memory().peek(10), Some(2));
    }

    #[test]
    fn rejects_addresses_outside_memory() {
        let mut machine = loads();
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.set_instruction_pointer(DEFAULT_CAPACITY);
        debugger.set_memory(DEFAULT_CAPACITY, 1);
        debugger.set_breakpoint(DEFAULT_CAPACITY + 4);
        debugger.show_memory(998, Some(1000));
        assert_eq!(errors(debugger.view()).len(), 4);
        assert!(debugger.breakpoints().is_empty());
        assert_eq!(machine.cpu().instruction_pointer, 0);
    }

    #[test]
    fn runs_until_breakpoint() {
        let mut machine = loads();
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.set_breakpoint(4);
        debugger.run();
        assert_eq!(debugger.machine().cpu().instruction_pointer, 4);
        assert_eq!(debugger.machine().cpu().accumulator, 3);
        assert!(!debugger.machine().is_halted());
    }

    #[test]
    fn runs_until_end() {
        let mut machine = loads();
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.run();
        let view = debugger.into_view();
        assert_eq!(machine.cpu().instruction_pointer, 10);
        assert!(machine.is_halted());
        assert_eq!(view.count(|event| matches!(event, Event::Instruction(..))), 5);
        assert_eq!(
            view.events.last(),
            Some(&Event::Cpu(CpuView {
                accumulator: 5,
                instruction_pointer: 10,
                next: Some(Halt),
            }))
        );
    }

    #[test]
    fn runs_from_breakpoint() {
        let mut machine = loads();
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.set_breakpoint(0);
        debugger.set_breakpoint(4);
        debugger.run();
        assert_eq!(debugger.machine().cpu().instruction_pointer, 4);
        debugger.run();
        assert_eq!(debugger.machine().cpu().instruction_pointer, 10);
    }

    #[test]
    fn halted_machine_does_not_run() {
        let mut machine = loads();
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.run();
        debugger.run();
        debugger.step(1);
        let view = debugger.into_view();
        assert_eq!(view.count(|event| matches!(event, Event::Halted)), 3);
        assert_eq!(view.count(|event| matches!(event, Event::Instruction(..))), 5);

        // Moving the instruction pointer resumes the machine
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.set_instruction_pointer(6);
        debugger.run();
        assert_eq!(machine.cpu().instruction_pointer, 10);
        assert_eq!(machine.cpu().accumulator, 5);
    }

    #[test]
    fn execution_errors_are_reported() {
        let mut machine = machine(&[Load(1), Print(-1), Halt], &[]);
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.run();
        assert_eq!(
            errors(debugger.view()),
            vec!["Address -1 is outside of memory [0, 1000)".to_string()]
        );
        assert_eq!(debugger.machine().cpu().instruction_pointer, 2);
        assert!(!debugger.machine().is_halted());
    }

    #[test]
    fn shows_memory() {
        let mut machine = loads();
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.show_memory(2, Some(4));
        assert_eq!(
            memory_of(debugger.view()),
            Some(&vec![
                cell(2, 8, false, false, "load"),
                cell(3, 3, false, false, "add"),
                cell(4, 8, false, false, "load"),
            ])
        );
    }

    #[test]
    fn shows_memory_with_instruction_pointer() {
        let mut machine = loads();
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.show_memory(0, Some(2));
        assert_eq!(
            memory_of(debugger.view()),
            Some(&vec![
                cell(0, 8, true, false, "load"),
                cell(1, 2, false, false, "read"),
                cell(2, 8, false, false, "load"),
            ])
        );
        debugger.show_memory(9, None);
        assert_eq!(
            memory_of(debugger.view()),
            Some(&vec![cell(9, 0, false, false, "halt")])
        );
    }

    #[test]
    fn shows_memory_with_breakpoint() {
        let mut machine = loads();
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.set_breakpoint(3);
        debugger.show_memory(2, Some(4));
        assert_eq!(
            memory_of(debugger.view()),
            Some(&vec![
                cell(2, 8, false, false, "load"),
                cell(3, 3, false, true, "add"),
                cell(4, 8, false, false, "load"),
            ])
        );
        debugger.show_memory(4, Some(2));
        assert_eq!(
            errors(debugger.view()),
            vec!["Empty range from 4 to 2".to_string()]
        );
    }

    #[test]
    fn shows_breakpoints() {
        let mut machine = loads();
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.set_breakpoint(6);
        debugger.set_breakpoint(3);
        debugger.set_breakpoint(6);
        debugger.show_breakpoints();
        assert_eq!(
            breakpoints_of(debugger.view()),
            Some(&vec![
                BreakpointView {
                    address: 3,
                    is_current: false,
                    value: 3,
                    mnemonic: "add"
                },
                BreakpointView {
                    address: 6,
                    is_current: false,
                    value: 8,
                    mnemonic: "load"
                },
            ])
        );
        assert_eq!(
            debugger.view().last(|event| matches!(event, Event::Report(_))),
            Some(&Event::Report(
                "Breakpoint already exists at address 6".to_string()
            ))
        );
    }

    #[test]
    fn clears_breakpoint() {
        let mut machine = loads();
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.set_breakpoint(4);
        debugger.set_breakpoint(6);
        debugger.clear_breakpoint(4);
        debugger.clear_breakpoint(4);
        assert_eq!(debugger.breakpoints().iter().collect::<Vec<_>>(), vec![6]);
        assert_eq!(
            errors(debugger.view()),
            vec!["No breakpoint at address 4".to_string()]
        );
    }

    #[test]
    fn line_commands_need_debug_information() {
        let mut machine = loads();
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.set_breakpoint_at_line(4);
        debugger.show_source(None, None);
        debugger.show_symbol("start");
        assert_eq!(
            errors(debugger.view()),
            vec![
                "Debug information is not available".to_string(),
                "Debug information is not available".to_string(),
                "Debug information is not available".to_string(),
            ]
        );
        assert!(debugger.breakpoints().is_empty());
    }

    const SOURCE: &str = concat!(
        "segment: data\n",
        "           value 1 0\n",
        "segment: code\n",
        "   start:  read  value\n",
        "           load  0\n",
        "           add   value\n",
        "           read  value\n",
        "           add   value\n",
        "           store value\n",
        "           print value\n",
        "           halt  0\n",
    );

    fn source_line(number: usize, is_current: bool, is_breakpoint: bool) -> SourceLine {
        SourceLine {
            number,
            is_current,
            is_breakpoint,
            text: SOURCE.lines().nth(number - 1).unwrap().to_string(),
        }
    }

    fn program_map() -> ProgramMap {
        #[rustfmt::skip]
        let table = [
            (4, 0, Some("start")), (5, 2, None), (6, 4, None), (7, 6, None),
            (8, 8, None), (9, 10, None), (10, 12, None), (11, 14, None), (2, 16, Some("value")),
        ];
        ProgramMap::from_table(table.into_iter().map(|(line, address, symbol)| Record {
            line,
            address,
            symbol: symbol.map(str::to_string),
        }))
        .unwrap()
    }

    /// Reads twice, and prints the sum.
    fn with_source(inputs: &[Word]) -> TestMachine {
        machine(
            &[
                Read(16),
                Load(0),
                Add(16),
                Read(16),
                Add(16),
                Store(16),
                Print(16),
                Halt,
            ],
            inputs,
        )
    }

    fn debugger<'m>(machine: &'m mut TestMachine) -> Debugger<'m, Recorder, ScriptedInput, Vec<Word>> {
        Debugger::new(machine, Recorder::default())
            .with_map(Some(program_map()))
            .with_source(Some(SOURCE))
    }

    #[test]
    fn executes_single_step() {
        let mut machine = with_source(&[20, 30]);
        let mut debugger = debugger(&mut machine);
        debugger.step(1);
        assert_eq!(debugger.machine().cpu().instruction_pointer, 2);
        assert_eq!(
            source_of(debugger.view()),
            Some(&vec![
                source_line(4, false, false),
                source_line(5, true, false),
                source_line(6, false, false),
            ])
        );
    }

    #[test]
    fn executes_multiple_steps() {
        let mut machine = with_source(&[20, 30]);
        let mut debugger = debugger(&mut machine);
        debugger.step(3);
        assert_eq!(debugger.machine().cpu().instruction_pointer, 2 * 3);
        let view = debugger.into_view();
        assert_eq!(view.count(|event| matches!(event, Event::Cpu(_))), 3);
    }

    #[test]
    fn step_stops_at_breakpoint() {
        let mut machine = with_source(&[20, 30]);
        let mut debugger = debugger(&mut machine);
        debugger.set_breakpoint(4);
        debugger.step(5);
        assert_eq!(debugger.machine().cpu().instruction_pointer, 4);
    }

    #[test]
    fn runs_whole_program() {
        let mut machine = with_source(&[20, 30]);
        debugger(&mut machine).run();
        assert_eq!(machine.output(), &vec![50]);
    }

    #[test]
    fn clears_breakpoint_at_line() {
        let mut machine = with_source(&[]);
        let mut debugger = debugger(&mut machine);
        debugger.set_breakpoint_at_line(4);
        debugger.set_breakpoint_at_line(6);
        debugger.clear_breakpoint_at_line(4);
        debugger.show_breakpoints();
        assert_eq!(
            breakpoints_of(debugger.view()),
            Some(&vec![BreakpointView {
                address: 4,
                is_current: false,
                value: 3,
                mnemonic: "add"
            }])
        );
        debugger.set_breakpoint_at_line(1);
        assert_eq!(
            errors(debugger.view()),
            vec!["No address is recorded for line 1".to_string()]
        );
    }

    #[test]
    fn shows_source() {
        let mut machine = with_source(&[]);
        let mut debugger = debugger(&mut machine);
        debugger.show_source(Some(1), Some(10));
        let expected: Vec<_> = (1..=10)
            .map(|number| source_line(number, number == 4, false))
            .collect();
        assert_eq!(source_of(debugger.view()), Some(&expected));
    }

    #[test]
    fn shows_source_with_breakpoints() {
        let mut machine = with_source(&[]);
        let mut debugger = debugger(&mut machine);
        debugger.set_breakpoint(4);
        debugger.set_breakpoint_at_line(8);
        debugger.show_source(Some(1), Some(10));
        let expected: Vec<_> = (1..=10)
            .map(|number| source_line(number, number == 4, number == 6 || number == 8))
            .collect();
        assert_eq!(source_of(debugger.view()), Some(&expected));
    }

    #[test]
    fn default_source_window_is_clipped() {
        let mut machine = with_source(&[]);
        let mut debugger = debugger(&mut machine);
        debugger.show_source(None, None);
        let lines = source_of(debugger.view()).unwrap();
        assert_eq!(lines.first().map(|line| line.number), Some(1));
        assert_eq!(lines.last().map(|line| line.number), Some(11));

        debugger.show_source(Some(9), None);
        let numbers: Vec<_> = source_of(debugger.view())
            .unwrap()
            .iter()
            .map(|line| line.number)
            .collect();
        assert_eq!(numbers, vec![9, 10, 11]);

        debugger.show_source(Some(12), None);
        assert_eq!(
            errors(debugger.view()),
            vec!["Line 12 is outside of the source (1 to 11)".to_string()]
        );
    }

    #[test]
    fn shows_symbol() {
        let mut machine = with_source(&[]);
        let mut debugger = debugger(&mut machine);
        debugger.show_symbol("value");
        assert_eq!(
            memory_of(debugger.view()),
            Some(&vec![
                cell(16, 0, false, false, "halt"),
                cell(17, 0, false, false, "halt"),
            ])
        );
        debugger.show_symbol("nothing");
        assert_eq!(
            errors(debugger.view()),
            vec!["Unknown symbol `nothing`".to_string()]
        );
    }

    #[test]
    fn session_runs_commands_until_quit() {
        let mut machine = with_source(&[20, 30]);
        let mut debugger = debugger(&mut machine);
        let mut reader = CommandReader::scripted(
            "break at line 9; run\nshow value\n\n jump 3 \nquit\nshow cpu",
        );
        debugger.start(&mut reader);
        let view = debugger.into_view();

        assert_eq!(view.events.first(), Some(&Event::Opening));
        assert_eq!(view.events.last(), Some(&Event::Closing));
        assert_eq!(
            view.count(|event| matches!(event, Event::Command(_))),
            5
        );
        assert_eq!(
            view.last(|event| matches!(event, Event::InvalidCommand(_))),
            Some(&Event::InvalidCommand("jump 3".to_string()))
        );
        assert_eq!(
            memory_of(&view),
            Some(&vec![
                cell(16, 30, false, false, "halt"),
                cell(17, 0, false, false, "halt"),
            ])
        );
        // `show cpu` comes after `quit`
        assert_eq!(
            view.last(|event| matches!(event, Event::Cpu(_))),
            Some(&Event::Cpu(CpuView {
                accumulator: 50,
                instruction_pointer: 10,
                next: Some(Store(16)),
            }))
        );
        assert_eq!(machine.cpu().instruction_pointer, 10);
    }

    #[test]
    fn session_ends_with_input() {
        let mut machine = loads();
        let mut debugger = Debugger::new(&mut machine, Recorder::default());
        debugger.start(&mut CommandReader::scripted("help; step 2"));
        let view = debugger.into_view();
        assert_eq!(view.count(|event| matches!(event, Event::Help)), 1);
        assert_eq!(view.events.last(), Some(&Event::Closing));
        assert_eq!(machine.cpu().instruction_pointer, 4);
    }
}
