use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::assert_panic;
use crate::nn::DropoutMask;

#[test]
fn test_new_keeps_everything() {
    let mask = DropoutMask::new(0.5, 4);
    assert_eq!(mask.len(), 4);
    assert_eq!(mask.keep_probability(), 0.5);
    assert!((0..4).all(|i| mask[i]));
}

#[test]
fn test_invalid_keep_probability() {
    assert_panic!(DropoutMask::new(0.0, 3));
    assert_panic!(DropoutMask::new(1.5, 3));
}

#[test]
fn test_from_pattern() {
    let mask = DropoutMask::from_pattern(&[true, false, false, true]);
    assert!(mask[0] && !mask[1] && !mask[2] && mask[3]);
    assert_eq!(mask.keep_probability(), 0.5);
}

#[test]
fn test_randomize() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut mask = DropoutMask::new(0.7, 10_000);
    mask.randomize(&mut rng);
    let kept = (0..mask.len()).filter(|&i| mask[i]).count();
    let fraction = kept as f64 / mask.len() as f64;
    assert!((fraction - 0.7).abs() < 0.02, "保留比例为{fraction}");

    // 同一种子得到同样的掩码
    let mut again = DropoutMask::new(0.7, 10_000);
    again.randomize(&mut StdRng::seed_from_u64(42));
    assert_eq!(mask, again);

    // 保留概率为1时全部保留
    let mut full = DropoutMask::new(1.0, 100);
    full.randomize(&mut rng);
    assert!((0..100).all(|i| full[i]));
}
