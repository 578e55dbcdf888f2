//! Instruction set of the target stack machine.

use std::fmt;

/// What kind of operand an opcode carries, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Int,
    Str,
    Type,
    Method,
    Constructor,
    Field,
    Local,
    Arg,
    Label,
}

/// Stack machine operation codes.
///
/// Most operations pop their inputs from the operand stack and push their
/// result. Addresses are first-class stack values that `Call`, `LoadField`,
/// `StoreField` and `LoadFieldAddress` accept in place of a value-type receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push null reference.
    PushNull,
    /// Push boolean true.
    PushTrue,
    /// Push boolean false.
    PushFalse,
    /// Push 32-bit integer.
    /// Operand: Int
    PushInt,
    /// Push string literal.
    /// Operand: Str
    PushString,
    /// Push type literal.
    /// Operand: Type
    PushType,
    /// Push the default value of a value type (an absent nullable, a zeroed struct).
    /// Operand: Type
    DefaultValue,

    // =========================================================================
    // Stack Operations
    // =========================================================================
    /// Pop top of stack.
    Pop,
    /// Duplicate top of stack.
    Dup,

    // =========================================================================
    // Arguments and Locals
    // =========================================================================
    /// Operand: Arg
    LoadArg,
    /// Push the address of an argument.
    /// Operand: Arg
    LoadArgAddress,
    /// Operand: Arg
    StoreArg,
    /// Operand: Local
    LoadLocal,
    /// Push the address of a local.
    /// Operand: Local
    LoadLocalAddress,
    /// Operand: Local
    StoreLocal,

    // =========================================================================
    // Fields
    // =========================================================================
    /// Pop instance (value or address), push field value.
    /// Operand: Field
    LoadField,
    /// Pop instance (address or reference), push field address.
    /// Operand: Field
    LoadFieldAddress,
    /// Pop value, pop instance (address or reference), store.
    /// Operand: Field
    StoreField,
    /// Operand: Field
    LoadStaticField,
    /// Operand: Field
    LoadStaticFieldAddress,
    /// Pop value, store into a static field.
    /// Operand: Field
    StoreStaticField,

    // =========================================================================
    // Comparison and Logic
    // =========================================================================
    /// Pop two values, push whether they are equal.
    Equal,
    /// Pop two values, push bitwise/logical exclusive or.
    Xor,
    /// Pop an integer, push its bitwise complement.
    BitNot,

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// Unconditional jump.
    /// Operand: Label
    Jump,
    /// Pop a bool, jump when it is false.
    /// Operand: Label
    JumpIfFalse,
    /// Return from the method; the result, if any, is the only stack value.
    Return,

    // =========================================================================
    // Calls and Objects
    // =========================================================================
    /// Pop receiver (if any) and arguments, call the method directly.
    /// Operand: Method
    Call,
    /// Like `Call`, dispatching on the receiver's runtime type.
    /// Operand: Method
    CallVirtual,
    /// Pop constructor arguments, push the new instance.
    /// Operand: Constructor
    NewObject,

    // =========================================================================
    // Casts
    // =========================================================================
    /// Pop reference, push it when it is an instance of the type, else fail.
    /// Operand: Type
    CastClass,
    /// Pop reference, push it when it is an instance of the type, else null.
    /// Operand: Type
    IsInstance,
}

impl OpCode {
    /// The operand this opcode requires.
    pub fn operand_kind(&self) -> Option<OperandKind> {
        use OpCode::*;
        match self {
            PushInt => Some(OperandKind::Int),
            PushString => Some(OperandKind::Str),
            PushType | DefaultValue | CastClass | IsInstance => Some(OperandKind::Type),
            LoadArg | LoadArgAddress | StoreArg => Some(OperandKind::Arg),
            LoadLocal | LoadLocalAddress | StoreLocal => Some(OperandKind::Local),
            LoadField | LoadFieldAddress | StoreField | LoadStaticField
            | LoadStaticFieldAddress | StoreStaticField => Some(OperandKind::Field),
            Jump | JumpIfFalse => Some(OperandKind::Label),
            Call | CallVirtual => Some(OperandKind::Method),
            NewObject => Some(OperandKind::Constructor),
            PushNull | PushTrue | PushFalse | Pop | Dup | Equal | Xor | BitNot | Return => None,
        }
    }

    /// Whether control may continue somewhere other than the next instruction.
    pub fn is_branch(&self) -> bool {
        matches!(self, OpCode::Jump | OpCode::JumpIfFalse)
    }

    /// Get the opcode name for debugging.
    pub fn name(&self) -> &'static str {
        use OpCode::*;
        match self {
            PushNull => "PushNull",
            PushTrue => "PushTrue",
            PushFalse => "PushFalse",
            PushInt => "PushInt",
            PushString => "PushString",
            PushType => "PushType",
            DefaultValue => "DefaultValue",
            Pop => "Pop",
            Dup => "Dup",
            LoadArg => "LoadArg",
            LoadArgAddress => "LoadArgAddress",
            StoreArg => "StoreArg",
            LoadLocal => "LoadLocal",
            LoadLocalAddress => "LoadLocalAddress",
            StoreLocal => "StoreLocal",
            LoadField => "LoadField",
            LoadFieldAddress => "LoadFieldAddress",
            StoreField => "StoreField",
            LoadStaticField => "LoadStaticField",
            LoadStaticFieldAddress => "LoadStaticFieldAddress",
            StoreStaticField => "StoreStaticField",
            Equal => "Equal",
            Xor => "Xor",
            BitNot => "BitNot",
            Jump => "Jump",
            JumpIfFalse => "JumpIfFalse",
            Return => "Return",
            Call => "Call",
            CallVirtual => "CallVirtual",
            NewObject => "NewObject",
            CastClass => "CastClass",
            IsInstance => "IsInstance",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_name() {
        assert_eq!(OpCode::PushTrue.name(), "PushTrue");
        assert_eq!(OpCode::LoadFieldAddress.to_string(), "LoadFieldAddress");
    }

    #[test]
    fn operand_kinds() {
        assert_eq!(OpCode::Dup.operand_kind(), None);
        assert_eq!(OpCode::PushInt.operand_kind(), Some(OperandKind::Int));
        assert_eq!(OpCode::JumpIfFalse.operand_kind(), Some(OperandKind::Label));
        assert_eq!(OpCode::DefaultValue.operand_kind(), Some(OperandKind::Type));
        assert_eq!(OpCode::StoreStaticField.operand_kind(), Some(OperandKind::Field));
        assert_eq!(OpCode::NewObject.operand_kind(), Some(OperandKind::Constructor));
    }

    #[test]
    fn branches() {
        assert!(OpCode::Jump.is_branch());
        assert!(OpCode::JumpIfFalse.is_branch());
        assert!(!OpCode::Return.is_branch());
    }
}
