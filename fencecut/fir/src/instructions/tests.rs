use crate::{Block, InstructionData, PhiNode, Value};

#[test]
fn successors_are_deduplicated() {
    let [b0, b1, b2] = [0usize, 1, 2].map(Block::from);
    let cond = Value::from(0usize);
    let switch = InstructionData::Switch { cond, default: b1, cases: vec![(0, b2), (1, b1), (2, b0)] };
    assert_eq!(switch.successors().as_slice(), &[b1, b2, b0]);

    let br = InstructionData::Branch { cond, then_dst: b1, else_dst: b1 };
    assert_eq!(br.successors().as_slice(), &[b1]);
    assert!(InstructionData::Ret { val: None }.successors().is_empty());
}

#[test]
fn retarget() {
    let [b0, b1, b2] = [0usize, 1, 2].map(Block::from);
    let cond = Value::from(0usize);
    let mut switch = InstructionData::Switch { cond, default: b1, cases: vec![(0, b1), (1, b2)] };
    switch.retarget(b1, b0);
    assert_eq!(switch, InstructionData::Switch { cond, default: b0, cases: vec![(0, b0), (1, b2)] });

    let [v0, v1] = [0usize, 1].map(Value::from);
    let mut phi = PhiNode { edges: vec![(b0, v0), (b1, v1)] };
    assert!(phi.retarget_edge(b1, b2));
    assert!(!phi.retarget_edge(b1, b2));
    assert_eq!(phi.edge_val(b2), Some(v1));
}

#[test]
fn operands() {
    let [v0, v1, v2] = [0usize, 1, 2].map(Value::from);
    let call = InstructionData::CallIndirect { callee: v0, args: vec![v1, v2] };
    assert_eq!(call.arguments().as_slice(), &[v0, v1, v2]);
    let store = InstructionData::Store { val: v1, ptr: v0, size: 4, inbounds: false };
    assert_eq!(store.arguments().as_slice(), &[v1, v0]);
    assert_eq!(store.pointer_operand(), Some(v0));
    assert_eq!(store.access_size(), Some(4));
    let xchg = InstructionData::CmpXchg { ptr: v0, expected: v1, replacement: v2, size: 2 };
    assert_eq!(xchg.arguments().as_slice(), &[v0, v1, v2]);
    assert_eq!(xchg.access_size(), Some(2));
    assert!(!store.is_terminator());
    assert!(InstructionData::Unreachable.is_terminator());
}
