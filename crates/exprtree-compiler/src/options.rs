//! Compiler configuration.

/// Whether argument slot 0 holds an implicit receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverSlot {
    /// Slot 0 is the receiver; parameters occupy slots 1..=N.
    #[default]
    Reserved,
    /// Static body; parameters occupy slots 0..N.
    None,
}

impl ReceiverSlot {
    /// Argument slot of the first parameter.
    pub fn first_param_slot(self) -> u16 {
        match self {
            ReceiverSlot::Reserved => 1,
            ReceiverSlot::None => 0,
        }
    }
}

/// Options for one compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    pub receiver: ReceiverSlot,
    /// Append the terminal `Return`. Disable when the caller writes its own epilogue.
    pub emit_return: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            receiver: ReceiverSlot::Reserved,
            emit_return: true,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_receiver(mut self, receiver: ReceiverSlot) -> Self {
        self.receiver = receiver;
        self
    }

    pub fn with_emit_return(mut self, emit_return: bool) -> Self {
        self.emit_return = emit_return;
        self
    }

    /// Options for a static body with no receiver slot.
    pub fn static_body() -> Self {
        Self::default().with_receiver(ReceiverSlot::None)
    }
}
