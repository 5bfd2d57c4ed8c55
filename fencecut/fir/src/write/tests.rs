use expect_test::expect;

use crate::tests::{append, append_val};
use crate::{
    BinaryOp, CastOp, Function, FunctionSignature, InstructionData, RmwOp, Type,
};

#[test]
fn all_operand_formats() {
    let mut func = Function::with_name("formats".to_owned());
    let ptr = func.dfg.make_param(Type::Ptr);
    let idx = func.dfg.make_param(Type::Scalar);
    let ctpop = func.import_function(FunctionSignature::intrinsic("ctpop", 1, true));
    let two = func.dfg.iconst(2);
    let table = func.dfg.global("table".to_owned());
    let b0 = func.layout.append_new_block();
    let b1 = func.layout.append_new_block();
    let b2 = func.layout.append_new_block();

    let addr = append_val(
        &mut func,
        b0,
        InstructionData::Gep { base: table, offsets: vec![idx, two] },
        Type::Ptr,
    );
    let val = append_val(
        &mut func,
        b0,
        InstructionData::Load { ptr: addr, size: 4, inbounds: true },
        Type::Scalar,
    );
    let quot = append_val(
        &mut func,
        b0,
        InstructionData::Binary { op: BinaryOp::Udiv, args: [val, two] },
        Type::Scalar,
    );
    let bits = append_val(
        &mut func,
        b0,
        InstructionData::Call { func_ref: ctpop, args: vec![quot] },
        Type::Scalar,
    );
    let as_ptr = append_val(
        &mut func,
        b0,
        InstructionData::Cast { op: CastOp::IntToPtr, arg: bits },
        Type::Ptr,
    );
    append(&mut func, b0, InstructionData::Store { val: bits, ptr, size: 8, inbounds: false });
    append_val(
        &mut func,
        b0,
        InstructionData::AtomicRmw { op: RmwOp::Add, ptr: as_ptr, val: two, size: 4 },
        Type::Scalar,
    );
    append(&mut func, b0, InstructionData::Opaque { mnemonic: "va_arg".into(), args: vec![ptr] });
    append(&mut func, b0, InstructionData::Switch { cond: bits, default: b1, cases: vec![(0, b2)] });
    append(&mut func, b1, InstructionData::Fence { tag: "oob store".into() });
    append(&mut func, b1, InstructionData::Ret { val: Some(bits) });
    append(&mut func, b2, InstructionData::Unreachable);

    let expected = expect![[r#"
        function %formats(v0:ptr, v1) {
            fn0 = intrinsic %ctpop(1) -> 1
            v2 = iconst 2
            v3:ptr = global %table

        block0:
            v4:ptr = gep v3, v1, v2
            v5 = load v4 size 4 inbounds
            v6 = udiv v5, v2
            v7 = call fn0(v6)
            v8:ptr = inttoptr v7
            store v7, v0
            v9 = atomic_rmw add v8, v2 size 4
            opaque "va_arg"(v0)
            switch v7, block1, [0: block2]

        block1:
            lfence "oob store"
            ret v7

        block2:
            unreachable
        }
    "#]];
    expected.assert_eq(&func.to_debug_string());
}
