//! Reference stack machine for compiled chunks.
//!
//! Executes one [`BytecodeChunk`] at a time against a [`TypeRegistry`]. Method
//! and constructor bodies that are not intrinsics are supplied by the host as
//! native closures:
//!
//! ```
//! use exprtree::vm::{Value, Vm};
//! use exprtree::{BytecodeEmitter, Expr, ExprCompiler, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! let mut emitter = BytecodeEmitter::new();
//! ExprCompiler::new(&registry)
//!     .compile(&Expr::conditional(Expr::bool(false), Expr::int(1), Expr::int(2)), &[], &mut emitter)
//!     .unwrap();
//! let chunk = emitter.finish().unwrap();
//!
//! let mut vm = Vm::new(&registry);
//! assert_eq!(vm.run(&chunk, None, &[]).unwrap(), Some(Value::Int32(2)));
//! ```

pub mod error;
pub mod value;

use std::rc::Rc;

use exprtree_compiler::{BytecodeChunk, Instruction, Label, LocalSlot, OpCode, Operand};
use exprtree_core::{
    ConstructorDef, ConstructorRef, DataType, FieldRef, Intrinsic, MethodDef, MethodRef, TypeHash,
    TypeKind,
};
use exprtree_registry::TypeRegistry;
use rustc_hash::FxHashMap;

pub use error::{RuntimeError, RuntimeResult};
pub use value::{Address, Object, ObjectRef, StructValue, Value};

/// Host body of a method: receives the dereferenced receiver (for instance
/// methods) and the arguments, returns the result for non-void methods.
pub type NativeMethod = Rc<dyn Fn(Option<&Value>, &[Value]) -> RuntimeResult<Option<Value>>>;

/// Host body of a constructor.
pub type NativeConstructor = Rc<dyn Fn(&[Value]) -> RuntimeResult<Value>>;

/// Executes chunks produced by the compiler.
///
/// Static field storage outlives a single run.
pub struct Vm<'r> {
    registry: &'r TypeRegistry,
    methods: FxHashMap<TypeHash, NativeMethod>,
    constructors: FxHashMap<TypeHash, NativeConstructor>,
    statics: FxHashMap<TypeHash, Value>,
}

/// Per-run machine state.
struct Frame {
    stack: Vec<Value>,
    args: Vec<Value>,
    locals: Vec<Value>,
}

impl Frame {
    fn pop(&mut self, op: OpCode) -> RuntimeResult<Value> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow { op })
    }

    /// Pop `count` values, returned in push order.
    fn pop_n(&mut self, count: usize, op: OpCode) -> RuntimeResult<Vec<Value>> {
        if self.stack.len() < count {
            return Err(RuntimeError::StackUnderflow { op });
        }
        Ok(self.stack.split_off(self.stack.len() - count))
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn arg_mut(&mut self, index: u16) -> RuntimeResult<&mut Value> {
        self.args
            .get_mut(usize::from(index))
            .ok_or(RuntimeError::BadArgument(index))
    }

    fn local_mut(&mut self, slot: LocalSlot) -> RuntimeResult<&mut Value> {
        self.locals
            .get_mut(usize::from(slot.0))
            .ok_or(RuntimeError::BadLocal(slot.0))
    }
}

impl<'r> Vm<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            methods: FxHashMap::default(),
            constructors: FxHashMap::default(),
            statics: FxHashMap::default(),
        }
    }

    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    /// Bind the body of `method`. Rebinding replaces the previous body.
    pub fn bind_method(
        &mut self,
        method: &MethodDef,
        body: impl Fn(Option<&Value>, &[Value]) -> RuntimeResult<Option<Value>> + 'static,
    ) {
        self.methods.insert(method.hash, Rc::new(body));
    }

    /// Bind the body of `constructor`.
    pub fn bind_constructor(
        &mut self,
        constructor: &ConstructorDef,
        body: impl Fn(&[Value]) -> RuntimeResult<Value> + 'static,
    ) {
        self.constructors.insert(constructor.hash, Rc::new(body));
    }

    /// Current value of a static field.
    pub fn static_value(&self, field: &FieldRef) -> Value {
        self.statics
            .get(&field.hash)
            .cloned()
            .unwrap_or_else(|| self.default_value(&field.data_type))
    }

    /// Run a chunk compiled with a reserved receiver slot. Argument 0 is the
    /// receiver, or null for static bodies.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(
        &mut self,
        chunk: &BytecodeChunk,
        receiver: Option<Value>,
        args: &[Value],
    ) -> RuntimeResult<Option<Value>> {
        let mut slots = Vec::with_capacity(args.len() + 1);
        slots.push(receiver.unwrap_or(Value::Null));
        slots.extend_from_slice(args);
        self.execute(chunk, slots)
    }

    /// Run a chunk compiled without a receiver slot.
    pub fn run_static(
        &mut self,
        chunk: &BytecodeChunk,
        args: &[Value],
    ) -> RuntimeResult<Option<Value>> {
        self.execute(chunk, args.to_vec())
    }

    fn execute(&mut self, chunk: &BytecodeChunk, args: Vec<Value>) -> RuntimeResult<Option<Value>> {
        tracing::debug!(
            instructions = chunk.len(),
            locals = chunk.locals().len(),
            args = args.len(),
            "run"
        );

        let mut frame = Frame {
            stack: Vec::new(),
            args,
            locals: chunk.locals().iter().map(|ty| self.default_value(ty)).collect(),
        };

        let mut ip = 0;
        while let Some(instr) = chunk.get(ip) {
            tracing::trace!(ip, op = %instr.op, depth = frame.stack.len(), "step");
            ip += 1;
            match self.step(&mut frame, instr)? {
                Flow::Next => {}
                Flow::Jump(label) => {
                    ip = chunk
                        .label_target(label)
                        .ok_or(RuntimeError::BadLabel(label))?;
                }
                Flow::Return => break,
            }
        }

        if frame.stack.len() > 1 {
            return Err(RuntimeError::StackImbalance(frame.stack.len()));
        }
        let result = frame.stack.pop();
        tracing::debug!(result = ?result.as_ref().map(|v| v.to_string()), "run finished");
        Ok(result)
    }

    fn step(&mut self, frame: &mut Frame, instr: &Instruction) -> RuntimeResult<Flow> {
        let op = instr.op;
        match op {
            // =================================================================
            // Constants
            // =================================================================
            OpCode::PushNull => frame.push(Value::Null),
            OpCode::PushTrue => frame.push(Value::Bool(true)),
            OpCode::PushFalse => frame.push(Value::Bool(false)),
            OpCode::PushInt => match instr.operand {
                Some(Operand::Int(v)) => frame.push(Value::Int32(v)),
                _ => return Err(RuntimeError::BadOperand(op)),
            },
            OpCode::PushString => match &instr.operand {
                Some(Operand::Str(s)) => frame.push(Value::string(s)),
                _ => return Err(RuntimeError::BadOperand(op)),
            },
            OpCode::PushType => frame.push(Value::Type(type_operand(instr)?.clone())),
            OpCode::DefaultValue => {
                let value = self.default_value(type_operand(instr)?);
                frame.push(value);
            }

            // =================================================================
            // Stack
            // =================================================================
            OpCode::Pop => {
                frame.pop(op)?;
            }
            OpCode::Dup => {
                let top = frame
                    .stack
                    .last()
                    .cloned()
                    .ok_or(RuntimeError::StackUnderflow { op })?;
                frame.push(top);
            }

            // =================================================================
            // Arguments and locals
            // =================================================================
            OpCode::LoadArg => {
                let value = frame.arg_mut(arg_operand(instr)?)?.clone();
                frame.push(value);
            }
            OpCode::LoadArgAddress => {
                let index = arg_operand(instr)?;
                frame.arg_mut(index)?;
                frame.push(Value::Address(Address::Arg(index)));
            }
            OpCode::StoreArg => {
                let value = frame.pop(op)?;
                *frame.arg_mut(arg_operand(instr)?)? = value;
            }
            OpCode::LoadLocal => {
                let value = frame.local_mut(local_operand(instr)?)?.clone();
                frame.push(value);
            }
            OpCode::LoadLocalAddress => {
                let slot = local_operand(instr)?;
                frame.local_mut(slot)?;
                frame.push(Value::Address(Address::Local(slot.0)));
            }
            OpCode::StoreLocal => {
                let value = frame.pop(op)?;
                *frame.local_mut(local_operand(instr)?)? = value;
            }

            // =================================================================
            // Fields
            // =================================================================
            OpCode::LoadField => {
                let field = field_operand(instr)?;
                let instance = frame.pop(op)?;
                let value = self.read_field(frame, instance, &field.declaring_type, field.index, op)?;
                frame.push(value);
            }
            OpCode::LoadFieldAddress => {
                let field = field_operand(instr)?;
                let address = match frame.pop(op)? {
                    Value::Object(object) => Address::ObjectField(object, field.index),
                    Value::Address(inner) => match self.load(frame, &inner)? {
                        Value::Object(object) => Address::ObjectField(object, field.index),
                        _ => Address::Field(Box::new(inner), field.index),
                    },
                    Value::Null => return Err(RuntimeError::NullReference { op }),
                    other => return Err(mismatch(op, "address or object", &other)),
                };
                frame.push(Value::Address(address));
            }
            OpCode::StoreField => {
                let field = field_operand(instr)?;
                let value = frame.pop(op)?;
                let instance = frame.pop(op)?;
                self.write_field(frame, instance, field.index, value, op)?;
            }
            OpCode::LoadStaticField => {
                let value = self.static_value(field_operand(instr)?);
                frame.push(value);
            }
            OpCode::LoadStaticFieldAddress => {
                let field = field_operand(instr)?.clone();
                frame.push(Value::Address(Address::Static(field)));
            }
            OpCode::StoreStaticField => {
                let field = field_operand(instr)?;
                let value = frame.pop(op)?;
                self.statics.insert(field.hash, value);
            }

            // =================================================================
            // Comparison and logic
            // =================================================================
            OpCode::Equal => {
                let right = frame.pop(op)?;
                let left = frame.pop(op)?;
                frame.push(Value::Bool(left == right));
            }
            OpCode::Xor => {
                let right = frame.pop(op)?;
                let left = frame.pop(op)?;
                let value = match (left, right) {
                    (Value::Bool(a), Value::Bool(b)) => Value::Bool(a ^ b),
                    (Value::Int32(a), Value::Int32(b)) => Value::Int32(a ^ b),
                    (Value::Int64(a), Value::Int64(b)) => Value::Int64(a ^ b),
                    (left, _) => return Err(mismatch(op, "matching bool or integer", &left)),
                };
                frame.push(value);
            }
            OpCode::BitNot => {
                let value = match frame.pop(op)? {
                    Value::Int32(v) => Value::Int32(!v),
                    Value::Int64(v) => Value::Int64(!v),
                    other => return Err(mismatch(op, "integer", &other)),
                };
                frame.push(value);
            }

            // =================================================================
            // Control flow
            // =================================================================
            OpCode::Jump => return Ok(Flow::Jump(label_operand(instr)?)),
            OpCode::JumpIfFalse => {
                let label = label_operand(instr)?;
                match frame.pop(op)? {
                    Value::Bool(false) => return Ok(Flow::Jump(label)),
                    Value::Bool(true) => {}
                    other => return Err(mismatch(op, "bool", &other)),
                }
            }
            OpCode::Return => return Ok(Flow::Return),

            // =================================================================
            // Calls and objects
            // =================================================================
            OpCode::Call | OpCode::CallVirtual => {
                let method = match &instr.operand {
                    Some(Operand::Method(m)) => m,
                    _ => return Err(RuntimeError::BadOperand(op)),
                };
                let args = frame.pop_n(method.params.len(), op)?;
                let receiver = if method.is_static() {
                    None
                } else {
                    Some(frame.pop(op)?)
                };
                let target = match (&receiver, op) {
                    (Some(receiver), OpCode::CallVirtual) => {
                        self.virtual_target(frame, receiver, method, op)?
                    }
                    _ => method.clone(),
                };
                if let Some(result) = self.invoke(frame, &target, receiver, &args, op)?
                    && !target.return_type.is_void()
                {
                    frame.push(result);
                }
            }
            OpCode::NewObject => {
                let constructor = match &instr.operand {
                    Some(Operand::Constructor(c)) => c,
                    _ => return Err(RuntimeError::BadOperand(op)),
                };
                let args = frame.pop_n(constructor.params.len(), op)?;
                let value = self.construct(constructor, args)?;
                frame.push(value);
            }

            // =================================================================
            // Casts
            // =================================================================
            OpCode::CastClass | OpCode::IsInstance => {
                let declared = type_operand(instr)?;
                // Nullables are stored unwrapped, so `T?` matches what `T` matches.
                let target = declared.underlying().unwrap_or(declared);
                let value = frame.pop(op)?;
                let runtime = match value.runtime_type() {
                    Some(runtime) => runtime,
                    None if value.is_null() => {
                        frame.push(value);
                        return Ok(Flow::Next);
                    }
                    None => return Err(mismatch(op, "reference", &value)),
                };
                if target.is_assignable_from(&runtime) {
                    frame.push(value);
                } else if op == OpCode::IsInstance {
                    frame.push(Value::Null);
                } else {
                    return Err(RuntimeError::InvalidCast {
                        from: runtime.to_string(),
                        to: target.to_string(),
                    });
                }
            }
        }
        Ok(Flow::Next)
    }

    // =========================================================================
    // Calls
    // =========================================================================

    fn virtual_target(
        &self,
        frame: &Frame,
        receiver: &Value,
        method: &MethodRef,
        op: OpCode,
    ) -> RuntimeResult<MethodRef> {
        let value = self.deref(frame, receiver.clone())?;
        if value.is_null() {
            return Err(RuntimeError::NullReference { op });
        }
        let runtime = value
            .runtime_type()
            .ok_or_else(|| mismatch(op, "object", &value))?;
        Ok(self
            .registry
            .resolve_virtual(&runtime, method)
            .unwrap_or_else(|| method.clone()))
    }

    fn invoke(
        &mut self,
        frame: &mut Frame,
        method: &MethodRef,
        receiver: Option<Value>,
        args: &[Value],
        op: OpCode,
    ) -> RuntimeResult<Option<Value>> {
        match method.intrinsic {
            Some(Intrinsic::NullableHasValue) => {
                let value = self.receiver_value(frame, receiver, op)?;
                return Ok(Some(Value::Bool(!value.is_null())));
            }
            Some(Intrinsic::NullableValue) => {
                let value = self.receiver_value(frame, receiver, op)?;
                if value.is_null() {
                    return Err(RuntimeError::AbsentValue);
                }
                return Ok(Some(value));
            }
            Some(Intrinsic::NullableEquals) => {
                let [left, right] = args else {
                    return Err(RuntimeError::BadOperand(op));
                };
                return Ok(Some(Value::Bool(left == right)));
            }
            Some(Intrinsic::FieldGet(index)) => {
                let instance = receiver.ok_or(RuntimeError::NullReference { op })?;
                let value =
                    self.read_field(frame, instance, &method.declaring_type, index, op)?;
                return Ok(Some(value));
            }
            Some(Intrinsic::FieldSet(index)) => {
                let instance = receiver.ok_or(RuntimeError::NullReference { op })?;
                let value = args.first().cloned().ok_or(RuntimeError::BadOperand(op))?;
                self.write_field(frame, instance, index, value, op)?;
                return Ok(None);
            }
            Some(Intrinsic::NullableNew) | None => {}
        }

        let body = self
            .methods
            .get(&method.hash)
            .cloned()
            .ok_or_else(|| RuntimeError::UnboundMethod(method.to_string()))?;
        let receiver = match receiver {
            Some(receiver) => Some(self.deref(frame, receiver)?),
            None => None,
        };
        let result = body(receiver.as_ref(), args)?;
        if result.is_none() && !method.return_type.is_void() {
            return Err(RuntimeError::Native(format!("{method} returned nothing")));
        }
        Ok(result)
    }

    fn receiver_value(
        &self,
        frame: &Frame,
        receiver: Option<Value>,
        op: OpCode,
    ) -> RuntimeResult<Value> {
        let receiver = receiver.ok_or(RuntimeError::NullReference { op })?;
        self.deref(frame, receiver)
    }

    fn construct(&self, constructor: &ConstructorRef, args: Vec<Value>) -> RuntimeResult<Value> {
        if constructor.intrinsic == Some(Intrinsic::NullableNew) {
            return args
                .into_iter()
                .next()
                .ok_or(RuntimeError::BadOperand(OpCode::NewObject));
        }
        if let Some(body) = self.constructors.get(&constructor.hash) {
            return body(&args);
        }
        let ty = &constructor.declaring_type;
        if constructor.params.is_empty() {
            match ty.kind() {
                TypeKind::Struct => return Ok(self.default_value(ty)),
                TypeKind::Class => return Ok(Value::object(ty.clone(), self.default_fields(ty))),
                _ => {}
            }
        }
        Err(RuntimeError::UnboundConstructor(ty.to_string()))
    }

    // =========================================================================
    // Storage
    // =========================================================================

    /// Zero value of a slot of type `ty`.
    fn default_value(&self, ty: &DataType) -> Value {
        match ty.kind() {
            TypeKind::Bool => Value::Bool(false),
            TypeKind::Int32 => Value::Int32(0),
            TypeKind::Int64 => Value::Int64(0),
            TypeKind::Float64 => Value::Float64(0.0),
            TypeKind::Struct => Value::Struct(StructValue {
                ty: ty.clone(),
                fields: self.default_fields(ty),
            }),
            _ => Value::Null,
        }
    }

    fn default_fields(&self, ty: &DataType) -> Vec<Value> {
        self.registry
            .instance_fields(ty)
            .iter()
            .map(|f| self.default_value(&f.data_type))
            .collect()
    }

    fn deref(&self, frame: &Frame, value: Value) -> RuntimeResult<Value> {
        match value {
            Value::Address(address) => self.load(frame, &address),
            other => Ok(other),
        }
    }

    fn load(&self, frame: &Frame, address: &Address) -> RuntimeResult<Value> {
        match address {
            Address::Arg(index) => frame
                .args
                .get(usize::from(*index))
                .cloned()
                .ok_or(RuntimeError::BadArgument(*index)),
            Address::Local(slot) => frame
                .locals
                .get(usize::from(*slot))
                .cloned()
                .ok_or(RuntimeError::BadLocal(*slot)),
            Address::Static(field) => Ok(self.static_value(field)),
            Address::ObjectField(object, index) => {
                let object = object.borrow();
                field_of(&object.fields, &object.ty, *index).cloned()
            }
            Address::Field(inner, index) => match self.load(frame, inner)? {
                Value::Struct(s) => field_of(&s.fields, &s.ty, *index).cloned(),
                Value::Object(object) => {
                    let object = object.borrow();
                    field_of(&object.fields, &object.ty, *index).cloned()
                }
                other => Err(RuntimeError::BadAddress(format!(
                    "field {index} of {}",
                    other.type_name()
                ))),
            },
        }
    }

    fn store(&mut self, frame: &mut Frame, address: &Address, value: Value) -> RuntimeResult<()> {
        match address {
            Address::Arg(index) => *frame.arg_mut(*index)? = value,
            Address::Local(slot) => *frame.local_mut(LocalSlot(*slot))? = value,
            Address::Static(field) => {
                self.statics.insert(field.hash, value);
            }
            Address::ObjectField(object, index) => {
                let mut object = object.borrow_mut();
                let ty = object.ty.clone();
                *field_of_mut(&mut object.fields, &ty, *index)? = value;
            }
            Address::Field(inner, index) => {
                // Structs are copied on load: read the container, patch it, write it back.
                let mut container = self.load(frame, inner)?;
                match &mut container {
                    Value::Struct(s) => *field_of_mut(&mut s.fields, &s.ty, *index)? = value,
                    Value::Object(object) => {
                        let mut object = object.borrow_mut();
                        let ty = object.ty.clone();
                        *field_of_mut(&mut object.fields, &ty, *index)? = value;
                        return Ok(());
                    }
                    other => {
                        return Err(RuntimeError::BadAddress(format!(
                            "field {index} of {}",
                            other.type_name()
                        )));
                    }
                }
                self.store(frame, inner, container)?;
            }
        }
        Ok(())
    }

    fn read_field(
        &self,
        frame: &Frame,
        instance: Value,
        declaring_type: &DataType,
        index: u16,
        op: OpCode,
    ) -> RuntimeResult<Value> {
        match self.deref(frame, instance)? {
            Value::Object(object) => {
                let object = object.borrow();
                field_of(&object.fields, &object.ty, index).cloned()
            }
            Value::Struct(s) => field_of(&s.fields, &s.ty, index).cloned(),
            Value::Null => Err(RuntimeError::NullReference { op }),
            other => Err(RuntimeError::BadField {
                ty: format!("{declaring_type} ({})", other.type_name()),
                index,
            }),
        }
    }

    fn write_field(
        &mut self,
        frame: &mut Frame,
        instance: Value,
        index: u16,
        value: Value,
        op: OpCode,
    ) -> RuntimeResult<()> {
        match instance {
            Value::Object(object) => self.store(frame, &Address::ObjectField(object, index), value),
            Value::Address(address) => self.store(frame, &Address::Field(Box::new(address), index), value),
            Value::Null => Err(RuntimeError::NullReference { op }),
            other => Err(mismatch(op, "address or object", &other)),
        }
    }
}

impl std::fmt::Debug for Vm<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("methods", &self.methods.len())
            .field("constructors", &self.constructors.len())
            .field("statics", &self.statics.len())
            .finish()
    }
}

enum Flow {
    Next,
    Jump(Label),
    Return,
}

fn field_of<'a>(fields: &'a [Value], ty: &DataType, index: u16) -> RuntimeResult<&'a Value> {
    fields.get(usize::from(index)).ok_or_else(|| RuntimeError::BadField {
        ty: ty.to_string(),
        index,
    })
}

fn field_of_mut<'a>(
    fields: &'a mut [Value],
    ty: &DataType,
    index: u16,
) -> RuntimeResult<&'a mut Value> {
    fields.get_mut(usize::from(index)).ok_or_else(|| RuntimeError::BadField {
        ty: ty.to_string(),
        index,
    })
}

fn mismatch(op: OpCode, expected: &'static str, found: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        op,
        expected,
        found: found.type_name(),
    }
}

fn type_operand(instr: &Instruction) -> RuntimeResult<&DataType> {
    match &instr.operand {
        Some(Operand::Type(ty)) => Ok(ty),
        _ => Err(RuntimeError::BadOperand(instr.op)),
    }
}

fn field_operand(instr: &Instruction) -> RuntimeResult<&FieldRef> {
    match &instr.operand {
        Some(Operand::Field(field)) => Ok(field),
        _ => Err(RuntimeError::BadOperand(instr.op)),
    }
}

fn arg_operand(instr: &Instruction) -> RuntimeResult<u16> {
    match instr.operand {
        Some(Operand::Arg(index)) => Ok(index),
        _ => Err(RuntimeError::BadOperand(instr.op)),
    }
}

fn local_operand(instr: &Instruction) -> RuntimeResult<LocalSlot> {
    match instr.operand {
        Some(Operand::Local(slot)) => Ok(slot),
        _ => Err(RuntimeError::BadOperand(instr.op)),
    }
}

fn label_operand(instr: &Instruction) -> RuntimeResult<Label> {
    match instr.operand {
        Some(Operand::Label(label)) => Ok(label),
        _ => Err(RuntimeError::BadOperand(instr.op)),
    }
}

#[cfg(test)]
mod tests {
    use exprtree_core::FieldDef;

    use super::*;

    fn chunk(code: Vec<Instruction>, labels: Vec<usize>, locals: Vec<DataType>) -> BytecodeChunk {
        BytecodeChunk::from_parts(code, labels, locals)
    }

    fn ins(op: OpCode, operand: Option<Operand>) -> Instruction {
        Instruction::new(op, operand)
    }

    #[test]
    fn xor_negates_booleans() {
        let registry = TypeRegistry::new();
        let code = chunk(
            vec![
                ins(OpCode::PushFalse, None),
                ins(OpCode::PushTrue, None),
                ins(OpCode::Xor, None),
            ],
            vec![],
            vec![],
        );
        let result = Vm::new(&registry).run_static(&code, &[]).unwrap();
        assert_eq!(result, Some(Value::Bool(true)));
    }

    #[test]
    fn jump_if_false_pops_its_condition() {
        let registry = TypeRegistry::new();
        let code = chunk(
            vec![
                ins(OpCode::PushFalse, None),
                ins(OpCode::JumpIfFalse, Some(Operand::Label(Label(0)))),
                ins(OpCode::PushInt, Some(Operand::Int(1))),
                ins(OpCode::PushInt, Some(Operand::Int(2))),
            ],
            vec![3],
            vec![],
        );
        let result = Vm::new(&registry).run_static(&code, &[]).unwrap();
        assert_eq!(result, Some(Value::Int32(2)));
    }

    #[test]
    fn leftover_values_are_an_imbalance() {
        let registry = TypeRegistry::new();
        let code = chunk(
            vec![ins(OpCode::PushTrue, None), ins(OpCode::PushTrue, None)],
            vec![],
            vec![],
        );
        let err = Vm::new(&registry).run_static(&code, &[]).unwrap_err();
        assert_eq!(err, RuntimeError::StackImbalance(2));
    }

    #[test]
    fn underflow_names_the_instruction() {
        let registry = TypeRegistry::new();
        let code = chunk(vec![ins(OpCode::Pop, None)], vec![], vec![]);
        let err = Vm::new(&registry).run_static(&code, &[]).unwrap_err();
        assert_eq!(err, RuntimeError::StackUnderflow { op: OpCode::Pop });
    }

    #[test]
    fn locals_start_at_their_default() {
        let registry = TypeRegistry::new();
        let code = chunk(
            vec![ins(OpCode::LoadLocal, Some(Operand::Local(LocalSlot(0))))],
            vec![],
            vec![DataType::nullable(&DataType::int32())],
        );
        let result = Vm::new(&registry).run_static(&code, &[]).unwrap();
        assert_eq!(result, Some(Value::Null));
    }

    #[test]
    fn store_through_a_field_address_updates_the_struct_in_place() {
        let mut registry = TypeRegistry::new();
        let point = DataType::structure("Point");
        registry.register_type(&point).unwrap();
        let x = registry.add_field(&point, "x", DataType::int32()).unwrap();
        registry.add_field(&point, "y", DataType::int32()).unwrap();

        let code = chunk(
            vec![
                ins(OpCode::LoadLocalAddress, Some(Operand::Local(LocalSlot(0)))),
                ins(OpCode::PushInt, Some(Operand::Int(9))),
                ins(OpCode::StoreField, Some(Operand::Field(x.clone()))),
                ins(OpCode::LoadLocal, Some(Operand::Local(LocalSlot(0)))),
            ],
            vec![],
            vec![point.clone()],
        );
        let result = Vm::new(&registry).run_static(&code, &[]).unwrap();
        assert_eq!(
            result,
            Some(Value::Struct(StructValue {
                ty: point,
                fields: vec![9.into(), 0.into()],
            }))
        );
    }

    #[test]
    fn statics_persist_across_runs() {
        let registry = TypeRegistry::new();
        let counter = FieldDef::new_static(&DataType::class("Counter"), "count", DataType::int32(), 0)
            .into_ref();
        let store = chunk(
            vec![
                ins(OpCode::PushInt, Some(Operand::Int(5))),
                ins(OpCode::StoreStaticField, Some(Operand::Field(counter.clone()))),
            ],
            vec![],
            vec![],
        );
        let load = chunk(
            vec![ins(OpCode::LoadStaticField, Some(Operand::Field(counter.clone())))],
            vec![],
            vec![],
        );

        let mut vm = Vm::new(&registry);
        assert_eq!(vm.static_value(&counter), Value::Int32(0));
        assert_eq!(vm.run_static(&store, &[]).unwrap(), None);
        assert_eq!(vm.run_static(&load, &[]).unwrap(), Some(Value::Int32(5)));
    }

    #[test]
    fn cast_class_rejects_unrelated_types() {
        let registry = TypeRegistry::new();
        let animal = DataType::class("Animal");
        let code = chunk(
            vec![
                ins(OpCode::PushString, Some(Operand::Str("x".into()))),
                ins(OpCode::CastClass, Some(Operand::Type(animal))),
            ],
            vec![],
            vec![],
        );
        let err = Vm::new(&registry).run_static(&code, &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidCast { .. }));
    }

    #[test]
    fn is_instance_yields_null_on_mismatch() {
        let registry = TypeRegistry::new();
        let code = chunk(
            vec![
                ins(OpCode::PushString, Some(Operand::Str("x".into()))),
                ins(OpCode::IsInstance, Some(Operand::Type(DataType::class("Animal")))),
            ],
            vec![],
            vec![],
        );
        let result = Vm::new(&registry).run_static(&code, &[]).unwrap();
        assert_eq!(result, Some(Value::Null));
    }

    #[test]
    fn is_instance_with_a_nullable_target_unwraps() {
        let registry = TypeRegistry::new();
        let maybe = DataType::nullable(&DataType::int32());
        let code = chunk(
            vec![
                ins(OpCode::LoadArg, Some(Operand::Arg(0))),
                ins(OpCode::IsInstance, Some(Operand::Type(maybe))),
            ],
            vec![],
            vec![],
        );
        let mut vm = Vm::new(&registry);
        assert_eq!(vm.run_static(&code, &[Value::Int32(4)]).unwrap(), Some(Value::Int32(4)));
        assert_eq!(vm.run_static(&code, &[Value::string("x")]).unwrap(), Some(Value::Null));
        assert_eq!(vm.run_static(&code, &[Value::Null]).unwrap(), Some(Value::Null));
    }

    #[test]
    fn unbound_methods_are_reported() {
        let registry = TypeRegistry::new();
        let method = MethodDef::new_static(&DataType::class("Math"), "Two", vec![], DataType::int32())
            .into_ref();
        let code = chunk(
            vec![ins(OpCode::Call, Some(Operand::Method(method.clone())))],
            vec![],
            vec![],
        );
        let mut vm = Vm::new(&registry);
        let err = vm.run_static(&code, &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::UnboundMethod(_)));

        vm.bind_method(&method, |_, _| Ok(Some(Value::Int32(2))));
        assert_eq!(vm.run_static(&code, &[]).unwrap(), Some(Value::Int32(2)));
    }
}
