use typed_index_collections::TiVec;

use crate::entities::{FuncRef, Inst, Param, Value};
use crate::instructions::InstructionData;
use crate::FunctionSignature;

/// Where a value comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueDef {
    /// Value is the result of an instruction.
    Result(Inst),
    /// Value is a function parameter.
    Param(Param),
    /// An integer constant.
    Const(i64),
    /// The address of a global. The index points into `DataFlowGraph::globals`.
    Global(u32),
    /// Referenced but not (yet) defined. Only exists while a function is being built.
    Invalid,
}

impl ValueDef {
    pub fn inst(self) -> Option<Inst> {
        if let ValueDef::Result(inst) = self {
            Some(inst)
        } else {
            None
        }
    }

    pub fn param(self) -> Option<Param> {
        if let ValueDef::Param(param) = self {
            Some(param)
        } else {
            None
        }
    }
}

/// The type class of a value. Only pointers are distinguished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Type {
    #[default]
    Scalar,
    Ptr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ValueData {
    def: ValueDef,
    ty: Type,
}

/// A data flow graph defines all instructions in a function as well as the data flow dependencies
/// between them.
///
/// The layout of blocks in the function and of instructions in each block is recorded by the
/// [`Layout`](crate::Layout) which forms the other half of the function representation.
#[derive(Clone, Debug, Default)]
pub struct DataFlowGraph {
    pub insts: TiVec<Inst, InstructionData>,
    results: TiVec<Inst, Option<Value>>,
    values: TiVec<Value, ValueData>,
    params: TiVec<Param, Value>,
    pub globals: Vec<String>,
    pub signatures: TiVec<FuncRef, FunctionSignature>,
}

impl DataFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of instructions created in this function, whether they are currently
    /// inserted in the layout or not.
    pub fn num_insts(&self) -> usize {
        self.insts.len()
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    pub fn make_inst(&mut self, data: InstructionData) -> Inst {
        self.results.push(None);
        self.insts.push_and_get_key(data)
    }

    /// Create a new value for the result of `inst`.
    pub fn make_inst_result(&mut self, inst: Inst, ty: Type) -> Value {
        debug_assert!(self.results[inst].is_none());
        let val = self.values.push_and_get_key(ValueData { def: ValueDef::Result(inst), ty });
        self.results[inst] = Some(val);
        val
    }

    pub fn make_param(&mut self, ty: Type) -> Value {
        let param = self.params.next_key();
        let val = self.values.push_and_get_key(ValueData { def: ValueDef::Param(param), ty });
        self.params.push(val);
        val
    }

    pub fn iconst(&mut self, val: i64) -> Value {
        self.values.push_and_get_key(ValueData { def: ValueDef::Const(val), ty: Type::Scalar })
    }

    pub fn global(&mut self, name: String) -> Value {
        let idx = self.globals.len() as u32;
        self.globals.push(name);
        self.values.push_and_get_key(ValueData { def: ValueDef::Global(idx), ty: Type::Ptr })
    }

    /// Define a value created by [`make_invalid_value`](Self::make_invalid_value) as the address
    /// of the global `name`.
    pub fn define_global(&mut self, val: Value, name: String) {
        let idx = self.globals.len() as u32;
        self.globals.push(name);
        self.define_value(val, ValueDef::Global(idx), Type::Ptr);
    }

    /// Reserve a value that is defined later with [`define_value`](Self::define_value).
    pub fn make_invalid_value(&mut self) -> Value {
        self.values.push_and_get_key(ValueData { def: ValueDef::Invalid, ty: Type::Scalar })
    }

    /// Define a value created by [`make_invalid_value`](Self::make_invalid_value).
    pub fn define_value(&mut self, val: Value, def: ValueDef, ty: Type) {
        debug_assert_eq!(self.values[val].def, ValueDef::Invalid);
        match def {
            ValueDef::Result(inst) => self.results[inst] = Some(val),
            ValueDef::Param(param) => {
                debug_assert_eq!(param, self.params.next_key());
                self.params.push(val);
            }
            _ => (),
        }
        self.values[val] = ValueData { def, ty };
    }

    pub fn value_def(&self, val: Value) -> ValueDef {
        self.values[val].def
    }

    pub fn value_type(&self, val: Value) -> Type {
        self.values[val].ty
    }

    pub fn is_ptr(&self, val: Value) -> bool {
        self.values[val].ty == Type::Ptr
    }

    /// The instruction that defines `val`, if any.
    pub fn value_inst(&self, val: Value) -> Option<Inst> {
        self.values[val].def.inst()
    }

    pub fn inst_result(&self, inst: Inst) -> Option<Value> {
        self.results[inst]
    }

    pub fn has_result(&self, inst: Inst) -> bool {
        self.results[inst].is_some()
    }

    pub fn params(&self) -> impl ExactSizeIterator<Item = Value> + '_ {
        self.params.iter().copied()
    }

    pub fn global_name(&self, idx: u32) -> &str {
        &self.globals[idx as usize]
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = Value> {
        self.values.keys()
    }

    /// The signature of the callee of a direct call.
    pub fn call_signature(&self, inst: Inst) -> Option<&FunctionSignature> {
        match self.insts[inst] {
            InstructionData::Call { func_ref, .. } => Some(&self.signatures[func_ref]),
            _ => None,
        }
    }
}
