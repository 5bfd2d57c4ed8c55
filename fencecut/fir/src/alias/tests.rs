use crate::tests::append_val;
use crate::{
    is_constant_address, AliasAnalysis, AliasResult, BasicAliasAnalysis, CastOp, Function,
    InstructionData, MemoryLocation, Type,
};

#[test]
fn basic_alias() {
    let mut func = Function::with_name("alias".to_owned());
    let p = func.dfg.make_param(Type::Ptr);
    let q = func.dfg.make_param(Type::Ptr);
    let i = func.dfg.make_param(Type::Scalar);
    let c0 = func.dfg.iconst(0);
    let c8 = func.dfg.iconst(8);
    let global = func.dfg.global("g".to_owned());
    let bb = func.layout.append_new_block();

    let a1 = append_val(&mut func, bb, InstructionData::Alloca { size: 16 }, Type::Ptr);
    let a2 = append_val(&mut func, bb, InstructionData::Alloca { size: 16 }, Type::Ptr);
    let p_i = append_val(&mut func, bb, InstructionData::Gep { base: p, offsets: vec![i] }, Type::Ptr);
    let p_i2 = append_val(&mut func, bb, InstructionData::Gep { base: p, offsets: vec![i] }, Type::Ptr);
    let a1_0 = append_val(&mut func, bb, InstructionData::Gep { base: a1, offsets: vec![c0] }, Type::Ptr);
    let a1_8 = append_val(&mut func, bb, InstructionData::Gep { base: a1, offsets: vec![c8] }, Type::Ptr);
    let a1_cast =
        append_val(&mut func, bb, InstructionData::Cast { op: CastOp::Bitcast, arg: a1 }, Type::Ptr);

    let loc = |ptr, size| MemoryLocation { ptr, size };
    let aa = BasicAliasAnalysis;
    let alias = |a, b| aa.alias(&func, a, b);

    assert_eq!(alias(loc(p, 8), loc(p, 8)), AliasResult::MustAlias);
    assert_eq!(alias(loc(p, 8), loc(p, 4)), AliasResult::MayAlias);
    assert_eq!(alias(loc(p, 8), loc(q, 8)), AliasResult::MayAlias);
    assert_eq!(alias(loc(p_i, 8), loc(p_i2, 8)), AliasResult::MustAlias);
    assert_eq!(alias(loc(a1, 8), loc(a2, 8)), AliasResult::NoAlias);
    assert_eq!(alias(loc(a1, 8), loc(global, 8)), AliasResult::NoAlias);
    assert_eq!(alias(loc(a1_0, 8), loc(a1_cast, 8)), AliasResult::MustAlias);
    assert_eq!(alias(loc(a1_0, 8), loc(a1_8, 8)), AliasResult::NoAlias);
    assert_eq!(alias(loc(a1_0, 16), loc(a1_8, 8)), AliasResult::MayAlias);
    assert_eq!(alias(loc(a1, 8), loc(p, 8)), AliasResult::MayAlias);

    assert!(is_constant_address(&func, a1_8));
    assert!(is_constant_address(&func, global));
    assert!(!is_constant_address(&func, p));
    assert!(!is_constant_address(&func, p_i));
}
