//! End-to-end pipeline tests: raw image + landmarks -> aligned crop ->
//! descriptor -> similarity, plus shared-graph concurrency.

use anyhow::Result;
use faceprint_core::net::descriptor::{InputShape, LayerDescriptor, ParamValue};
use faceprint_core::{similarity, FaceIdentifier, FacialLandmarks, ImageBuffer, ModelDescription};

const DESCRIPTOR_LEN: usize = 8;

/// 128x128 RGB input -> 8x8 max pool -> fully connected 8-dim descriptor.
fn model_description() -> ModelDescription {
    // Pool output is 3x16x16 = 768 features feeding the dense layer.
    let in_features = 3 * 16 * 16;
    let weights: Vec<f32> = (0..DESCRIPTOR_LEN * in_features)
        .map(|i| ((i % 13) as f32 - 6.0) / 100.0)
        .collect();

    ModelDescription {
        name: Some("pipeline-test".into()),
        input: InputShape {
            width: 128,
            height: 128,
            channels: 3,
        },
        feature_len: DESCRIPTOR_LEN,
        layers: vec![
            LayerDescriptor {
                name: "pool".into(),
                kind: "max_pool".into(),
                inputs: vec![],
                params: [("kernel".to_string(), ParamValue::Number(8.0))]
                    .into_iter()
                    .collect(),
            },
            LayerDescriptor {
                name: "fc".into(),
                kind: "fully_connected".into(),
                inputs: vec!["pool".into()],
                params: [
                    (
                        "out_features".to_string(),
                        ParamValue::Number(DESCRIPTOR_LEN as f64),
                    ),
                    ("weights".to_string(), ParamValue::Array(weights)),
                ]
                .into_iter()
                .collect(),
            },
        ],
    }
}

/// Deterministic 200x200 RGB test image with texture around the face area.
fn face_image() -> ImageBuffer {
    let pixels: Vec<u8> = (0..200u32 * 200 * 3)
        .map(|i| (i.wrapping_mul(2654435761) >> 23) as u8)
        .collect();
    ImageBuffer::from_pixels(200, 200, 3, pixels).expect("length matches")
}

/// Five landmarks roughly centered on the synthetic face.
fn face_landmarks() -> FacialLandmarks {
    FacialLandmarks::new([
        (80.0, 70.0),
        (120.0, 70.0),
        (100.0, 95.0),
        (85.0, 120.0),
        (115.0, 120.0),
    ])
}

#[test]
fn extract_and_score_round_trip() -> Result<()> {
    let identifier = FaceIdentifier::new(&model_description())?;
    assert_eq!(identifier.descriptor_len(), DESCRIPTOR_LEN);
    assert_eq!(identifier.crop_shape(), (128, 128, 3));

    let features = identifier.extract_with_alignment(&face_image(), &face_landmarks())?;
    assert_eq!(features.len(), DESCRIPTOR_LEN);
    assert!(features.iter().any(|&v| v != 0.0), "descriptor is all zero");

    // Same identity against itself scores ~1.0
    let self_score = identifier.similarity(&features, &features);
    assert!((self_score - 1.0).abs() < 1e-6, "self score {self_score}");

    // A zero vector is not comparable
    let zeros = vec![0.0f32; DESCRIPTOR_LEN];
    assert_eq!(
        identifier.similarity(&features, &zeros),
        similarity::SIMILARITY_UNDEFINED
    );

    Ok(())
}

#[test]
fn crop_is_deterministic_across_calls() -> Result<()> {
    let identifier = FaceIdentifier::new(&model_description())?;
    let image = face_image();
    let landmarks = face_landmarks();

    let first = identifier.crop_face(&image, &landmarks)?;
    let second = identifier.crop_face(&image, &landmarks)?;
    assert_eq!(first, second);
    assert_eq!(first.shape(), (128, 128, 3));

    Ok(())
}

#[test]
fn shifted_landmarks_still_produce_comparable_descriptors() -> Result<()> {
    // Two crops of the same face from slightly different landmark estimates
    // should agree far better than chance. Smooth texture keeps the pooled
    // activations stable under a one-pixel landmark shift.
    let identifier = FaceIdentifier::new(&model_description())?;
    let pixels: Vec<u8> = (0..200u32 * 200)
        .flat_map(|i| {
            let (x, y) = ((i % 200) as f32, (i / 200) as f32);
            let v = ((x * 0.07).sin() * (y * 0.05).cos() * 90.0 + 128.0) as u8;
            [v, v.wrapping_add(10), v.wrapping_add(20)]
        })
        .collect();
    let image = ImageBuffer::from_pixels(200, 200, 3, pixels).expect("length matches");

    let a = identifier.extract_with_alignment(&image, &face_landmarks())?;
    let shifted = FacialLandmarks::new([
        (81.0, 71.0),
        (121.0, 71.0),
        (101.0, 96.0),
        (86.0, 121.0),
        (116.0, 121.0),
    ]);
    let b = identifier.extract_with_alignment(&image, &shifted)?;

    let score = identifier.similarity(&a, &b);
    assert!(score > 0.5, "shifted-landmark score {score}");

    Ok(())
}

#[test]
fn concurrent_forward_matches_sequential() -> Result<()> {
    let identifier = FaceIdentifier::new(&model_description())?;

    // 100 distinct aligned crops
    let crops: Vec<ImageBuffer> = (0..100u32)
        .map(|seed| {
            let pixels: Vec<u8> = (0..128u32 * 128 * 3)
                .map(|i| (i.wrapping_mul(31).wrapping_add(seed * 7919) % 251) as u8)
                .collect();
            ImageBuffer::from_pixels(128, 128, 3, pixels).expect("length matches")
        })
        .collect();

    let sequential: Vec<Vec<f32>> = crops
        .iter()
        .map(|crop| identifier.extract(crop))
        .collect::<Result<_, _>>()?;

    let concurrent: Vec<Vec<f32>> = std::thread::scope(|scope| {
        let identifier = &identifier;
        let handles: Vec<_> = crops
            .iter()
            .map(|crop| scope.spawn(move || identifier.extract(crop)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("extraction thread panicked"))
            .collect::<Result<_, _>>()
    })?;

    assert_eq!(sequential, concurrent);
    Ok(())
}
