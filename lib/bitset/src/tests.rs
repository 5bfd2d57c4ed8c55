use crate::BitSet;

#[test]
fn insert_contains_remove() {
    let mut set: BitSet<usize> = BitSet::new_empty(130);
    assert!(set.is_empty());
    assert!(set.insert(0));
    assert!(set.insert(64));
    assert!(set.insert(129));
    assert!(!set.insert(64));
    assert!(set.contains(129));
    assert!(!set.contains(128));
    assert!(!set.contains(500));
    assert_eq!(set.count(), 3);
    assert!(set.remove(64));
    assert!(!set.remove(64));
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 129]);
}

#[test]
fn filled_has_no_excess_bits() {
    let set: BitSet<usize> = BitSet::new_filled(70);
    assert_eq!(set.count(), 70);
    assert_eq!(set.iter().last(), Some(69));
}

#[test]
fn set_operations() {
    let mut a: BitSet<usize> = BitSet::new_empty(100);
    let mut b: BitSet<usize> = BitSet::new_empty(100);
    a.extend([1, 2, 3]);
    b.extend([3, 4]);
    assert!(a.intersects(&b));
    assert!(a.union(&b));
    assert!(!a.union(&b));
    assert!(a.superset(&b));
    assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert!(a.subtract(&b));
    assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 2]);
    assert!(!a.intersects(&b));
    a.insert(3);
    assert!(a.intersect(&b));
    assert_eq!(a.first(), Some(3));
}

#[test]
fn growable() {
    let mut set: BitSet<usize> = BitSet::new_empty(0);
    assert!(set.insert_growable(200));
    assert!(!set.insert_growable(200));
    assert_eq!(set.domain_size(), 201);
    set.ensure(10);
    assert_eq!(set.domain_size(), 201);
    assert!(set.contains(200));
}
