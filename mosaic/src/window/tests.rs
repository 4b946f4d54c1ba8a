use super::*;
use crate::testing::episode;

fn collect(windower: &Windower, len: usize) -> Vec<Window> {
    windower.window(episode("ds", "ep", len)).unwrap().collect()
}

#[test]
fn rejects_zero_length_or_stride() {
    assert_eq!(Windower::new(0, 1), Err(WindowError::InvalidLength));
    assert_eq!(Windower::new(4, 0), Err(WindowError::InvalidStride));
}

#[test]
fn long_episode_window_count_and_offsets() {
    let windower = Windower::new(16, 8).unwrap();
    let windows = collect(&windower, 50);
    // floor((50 - 16) / 8) + 1
    assert_eq!(windows.len(), 5);
    assert_eq!(
        windows.iter().map(Window::start).collect::<Vec<_>>(),
        vec![0, 8, 16, 24, 32]
    );
    for w in &windows {
        assert_eq!(w.len(), 16);
        assert_eq!(w.valid_len(), 16);
        assert!(w.start() + w.len() <= 50);
    }
}

#[test]
fn count_matches_formula_for_many_shapes() {
    for length in 1..6 {
        for stride in 1..6 {
            let windower = Windower::new(length, stride).unwrap();
            for len in length..20 {
                let produced = collect(&windower, len);
                assert_eq!(produced.len(), (len - length) / stride + 1);
                assert_eq!(produced.len(), windower.count(len));
                assert!(produced.iter().all(|w| w.valid_len() == length));
            }
        }
    }
}

#[test]
fn short_episode_is_padded_with_last_step() {
    let windower = Windower::new(16, 8).unwrap();
    let windows = collect(&windower, 8);
    assert_eq!(windows.len(), 1);

    let w = &windows[0];
    assert_eq!(w.len(), 16);
    assert_eq!(w.valid_len(), 8);
    assert_eq!(&w.mask()[..8], &[true; 8]);
    assert_eq!(&w.mask()[8..], &[false; 8]);

    let last = w.step(7).clone();
    for i in 8..16 {
        assert_eq!(w.step(i), &last);
    }
    assert_eq!(w.actions().len(), 16 * 2);
}

#[test]
fn exact_fit_has_no_padding() {
    let windower = Windower::new(5, 3).unwrap();
    let windows = collect(&windower, 5);
    assert_eq!(windows.len(), 1);
    assert!(windows[0].mask().iter().all(|&v| v));
}

#[test]
fn overlapping_windows_share_steps() {
    let windower = Windower::new(4, 2).unwrap();
    let windows = collect(&windower, 8);
    assert_eq!(windows.len(), 3);
    assert_eq!(windows[0].step(2), windows[1].step(0));
}

#[test]
fn windows_never_cross_episodes() {
    let windower = Windower::new(3, 1).unwrap();
    for w in collect(&windower, 7) {
        assert!(w.steps().all(|s| s.index < 7));
        assert_eq!(w.episode_id(), "ep");
    }
}

#[test]
fn rewindowing_is_reproducible() {
    let windower = Windower::new(4, 3).unwrap();
    let ep = episode("ds", "ep", 11);
    let first: Vec<_> = windower.window(ep.clone()).unwrap().map(|w| (w.start(), w.actions())).collect();
    let second: Vec<_> = windower.window(ep).unwrap().map(|w| (w.start(), w.actions())).collect();
    assert_eq!(first, second);
}

#[test]
fn iterator_reports_exact_size() {
    let windower = Windower::new(4, 2).unwrap();
    let mut windows = windower.window(episode("ds", "ep", 10)).unwrap();
    assert_eq!(windows.len(), 4);
    windows.next();
    assert_eq!(windows.len(), 3);
}
