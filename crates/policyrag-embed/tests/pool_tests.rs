use candle_core::{DType, Device, Tensor};
use policyrag_embed::masked_mean_l2;
use policyrag_embed::tokenize::pad_or_truncate;

#[test]
fn masked_mean_l2_ignores_padding() {
    let dev = Device::Cpu;
    // second token is padding
    let h = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], (1, 2, 4), &dev).unwrap();
    let mask = Tensor::from_slice(&[1u32, 0], (1, 2), &dev).unwrap().to_dtype(DType::F32).unwrap();
    let out: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
    let norm = 30f32.sqrt();
    for (a, b) in out[0].iter().zip([1.0 / norm, 2.0 / norm, 3.0 / norm, 4.0 / norm]) {
        assert!((a - b).abs() < 1e-5, "a={a} b={b}");
    }
}

#[test]
fn masked_mean_l2_handles_batches() {
    let dev = Device::Cpu;
    let h = Tensor::from_slice(&[1.0f32, 0.0, 3.0, 0.0, 0.0, 2.0, 0.0, 4.0], (2, 2, 2), &dev).unwrap();
    let mask = Tensor::from_slice(&[1f32, 1.0, 1.0, 0.0], (2, 2), &dev).unwrap();
    let out: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
    assert_eq!(out.len(), 2);
    assert!((out[0][0] - 1.0).abs() < 1e-5 && out[0][1].abs() < 1e-5);
    assert!(out[1][0].abs() < 1e-5 && (out[1][1] - 1.0).abs() < 1e-5);
}

#[test]
fn rows_are_padded_and_truncated_to_max_len() {
    let (ids, mask) = pad_or_truncate(&[0, 10, 2], &[1, 1, 1], 5);
    assert_eq!(ids, vec![0, 10, 2, 1, 1]);
    assert_eq!(mask, vec![1, 1, 1, 0, 0]);
    let (ids, mask) = pad_or_truncate(&[0, 10, 11, 12, 2], &[1; 5], 3);
    assert_eq!(ids, vec![0, 10, 11]);
    assert_eq!(mask, vec![1, 1, 1]);
}
