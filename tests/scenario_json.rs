//! JSON-described golden scenarios for the full pipeline.
//!
//! Each case carries its tensors and the expected detections inline, so the
//! suite exercises the same serialized shape the CLI consumes without
//! depending on fixture files.

use freedet::{DecodeConfig, DecodeOutput, Decoder, LevelView};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LevelJson {
    height: usize,
    width: usize,
    objectness: Vec<f32>,
    class_scores: Vec<f32>,
    box_regression: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ExpectedJson {
    class_id: usize,
    min_score: f32,
    bbox: [f32; 4],
}

#[derive(Debug, Deserialize)]
struct CaseJson {
    name: String,
    strides: Vec<usize>,
    num_classes: usize,
    image_height: usize,
    image_width: usize,
    levels: Vec<LevelJson>,
    expected: Vec<ExpectedJson>,
}

const CASES: &str = r#"
[
    {
        "name": "confident_corner_cell",
        "strides": [8],
        "num_classes": 2,
        "image_height": 16,
        "image_width": 16,
        "levels": [
            {
                "height": 2,
                "width": 2,
                "objectness": [10.0, -10.0, -10.0, -10.0],
                "class_scores": [-10.0, 10.0, -10.0, -10.0, -10.0, -10.0, -10.0, -10.0],
                "box_regression": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                                   0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
            }
        ],
        "expected": [
            { "class_id": 1, "min_score": 0.99, "bbox": [0.0, 0.0, 0.5, 0.5] }
        ]
    },
    {
        "name": "duplicate_suppressed_across_levels",
        "strides": [8, 16],
        "num_classes": 1,
        "image_height": 16,
        "image_width": 16,
        "levels": [
            {
                "height": 2,
                "width": 2,
                "objectness": [-10.0, -10.0, -10.0, 8.0],
                "class_scores": [-10.0, -10.0, -10.0, 8.0],
                "box_regression": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                                   0.0, 0.0, 0.0, 0.0, -0.5, -0.5, 0.6931472, 0.6931472]
            },
            {
                "height": 1,
                "width": 1,
                "objectness": [10.0],
                "class_scores": [10.0],
                "box_regression": [0.0, 0.0, 0.0, 0.0]
            }
        ],
        "expected": [
            { "class_id": 0, "min_score": 0.999, "bbox": [0.0, 0.0, 1.0, 1.0] }
        ]
    }
]
"#;

#[test]
fn golden_cases_match_expected_detections() {
    let cases: Vec<CaseJson> = serde_json::from_str(CASES).unwrap();
    assert_eq!(cases.len(), 2);

    for case in cases {
        let views: Vec<LevelView<'_>> = case
            .levels
            .iter()
            .map(|level| {
                LevelView::new(
                    &level.objectness,
                    &level.class_scores,
                    &level.box_regression,
                    level.height,
                    level.width,
                    case.num_classes,
                )
                .unwrap()
            })
            .collect();

        let decoder = Decoder::new(case.strides.clone()).with_config(DecodeConfig {
            num_classes: case.num_classes,
            ..DecodeConfig::default()
        });
        let output = decoder
            .run(&views, case.image_height, case.image_width)
            .unwrap();
        let detections = match output {
            DecodeOutput::Detections(detections) => detections,
            DecodeOutput::Raw(_) => panic!("case {}: unexpected raw output", case.name),
        };

        assert_eq!(
            detections.len(),
            case.expected.len(),
            "case {}: detection count",
            case.name
        );
        for (det, expected) in detections.iter().zip(case.expected.iter()) {
            assert_eq!(det.class_id, expected.class_id, "case {}", case.name);
            assert!(det.score >= expected.min_score, "case {}", case.name);
            let got = [det.bbox.x1, det.bbox.y1, det.bbox.x2, det.bbox.y2];
            for (g, e) in got.iter().zip(expected.bbox.iter()) {
                assert!((g - e).abs() < 1e-3, "case {}: box {got:?}", case.name);
            }
        }
    }
}
