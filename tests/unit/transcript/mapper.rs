use super::*;

fn fps30() -> Fps {
    Fps::integer(30).unwrap()
}

#[test]
fn maps_times_to_rounded_frames_with_sentinel() {
    let t = Transcript::from_slice(
        br#"[{"word":"hi","time":0.0,"duration":0.5},{"word":"there","time":0.5,"duration":0.5}]"#,
        fps30(),
    )
    .unwrap();
    let frames: Vec<u64> = t.words().iter().map(|w| w.frame.0).collect();
    assert_eq!(frames, vec![0, 0, 15]);
    assert!(t.words()[0].is_empty());
    assert_eq!(t.words()[1].text, "hi");
}

#[test]
fn frame_is_round_of_time_times_fps_and_non_decreasing() {
    let times = [0.0, 0.016, 0.05, 0.2333, 0.25, 1.0, 1.0, 2.71828];
    let entries = times
        .iter()
        .map(|&time| TranscriptEntry {
            word: "w".to_owned(),
            time,
            duration: 0.1,
        })
        .collect();
    let t = Transcript::from_entries(entries, fps30()).unwrap();
    for (w, &time) in t.words()[1..].iter().zip(times.iter()) {
        assert_eq!(w.frame.0, (time * 30.0f64).round() as u64);
    }
    for pair in t.words().windows(2) {
        assert!(pair[0].frame <= pair[1].frame);
    }
}

#[test]
fn duration_defaults_to_zero_and_words_are_trimmed() {
    let t = Transcript::from_slice(br#"[{"word":"  hey ","time":1.0}]"#, fps30()).unwrap();
    assert_eq!(t.words()[1].text, "hey");
    assert_eq!(t.words()[1].duration_secs, 0.0);
}

#[test]
fn malformed_inputs_are_rejected() {
    let cases: [&[u8]; 5] = [
        b"not json",
        b"{}",
        b"[]",
        br#"[{"word":"a","time":-1.0}]"#,
        br#"[{"word":"a","time":2.0},{"word":"b","time":1.0}]"#,
    ];
    for bytes in cases {
        let err = Transcript::from_slice(bytes, fps30()).unwrap_err();
        assert!(
            matches!(err, CapsyncError::MalformedTranscript(_)),
            "unexpected error {err:?}"
        );
    }
}

#[test]
fn missing_file_is_a_malformed_transcript() {
    let err = Transcript::from_path(Path::new("does/not/exist.json"), fps30()).unwrap_err();
    assert!(matches!(err, CapsyncError::MalformedTranscript(_)));
}
