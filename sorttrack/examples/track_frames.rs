use ndarray::array;
use sorttrack::{FrameResult, SortConfig, SortTracker};

fn print_tracks(label: &str, result: &FrameResult) {
    let tracks = result.to_array();
    println!("\nFrame {}: {} tracks ({})", result.frame, tracks.nrows(), label);
    for row in tracks.outer_iter() {
        println!(
            "  Track ID {}: [{:.1}, {:.1}, {:.1}, {:.1}]",
            row[4], row[0], row[1], row[2], row[3]
        );
    }
}

fn main() -> sorttrack::Result<()> {
    let mut tracker = SortTracker::new(SortConfig::new(
        5,   // max_age: tracks die after 5 frames without detection
        2,   // min_hits: hits needed once the first 2 frames are over
        0.3, // iou_threshold: minimum IoU for track-detection association
    ))?;

    let frame1 = array![
        [10.0, 10.0, 50.0, 50.0],
        [100.0, 100.0, 150.0, 150.0],
        [200.0, 200.0, 240.0, 240.0],
    ];
    print_tracks("tracks created", &tracker.update_array(frame1.view()));

    let frame2 = array![
        [12.0, 12.0, 52.0, 52.0],
        [102.0, 98.0, 152.0, 148.0],
        [205.0, 195.0, 245.0, 235.0],
    ];
    print_tracks("objects moved", &tracker.update_array(frame2.view()));

    let frame3 = array![[14.0, 14.0, 54.0, 54.0], [210.0, 190.0, 250.0, 230.0]];
    print_tracks("one object disappeared", &tracker.update_array(frame3.view()));

    let frame4 = array![[16.0, 16.0, 56.0, 56.0], [300.0, 300.0, 340.0, 340.0]];
    print_tracks(
        "new object appeared, not yet confirmed",
        &tracker.update_array(frame4.view()),
    );

    println!("\nLive tracks: {}", tracker.num_tracks());
    println!("Frames processed: {}", tracker.frame_count());
    Ok(())
}
