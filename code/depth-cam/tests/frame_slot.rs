use std::collections::HashSet;
use std::thread;

use depth_cam::{CameraError, FrameSlot};
use grid_nano::Resolution;

#[test]
fn consumer_sees_nothing_before_first_publish() {
    let (_producer, mut consumer) = FrameSlot::new(Resolution::new(4, 4)).split();
    assert!(consumer.take_latest().is_none());
    assert!(consumer.current().is_none());
}

#[test]
fn latest_frame_wins() {
    let (mut producer, mut consumer) = FrameSlot::new(Resolution::new(2, 2)).split();
    producer.write(&[1, 1, 1, 1]).unwrap();
    producer.write(&[2, 2, 2, 2]).unwrap();
    assert_eq!(producer.write(&[3, 3, 3, 3]).unwrap(), 3);

    let frame = consumer.take_latest().unwrap();
    assert_eq!(frame.sequence(), 3);
    assert_eq!(frame.samples().data(), &[3, 3, 3, 3]);
    assert_eq!(consumer.skipped(), 2);

    // 同一帧只交付一次
    assert!(consumer.take_latest().is_none());
    assert_eq!(consumer.current().map(|f| f.sequence()), Some(3));
}

#[test]
fn buffers_are_recycled_without_tearing() {
    let (mut producer, mut consumer) = FrameSlot::new(Resolution::new(3, 1)).split();
    for i in 1..=5u16 {
        producer.back_buffer().fill(i);
        producer.publish();
        let frame = consumer.take_latest().unwrap();
        assert_eq!(frame.sequence(), i as u64);
        assert!(frame.samples().data().iter().all(|&s| s == i));
    }
    assert_eq!(consumer.skipped(), 0);
}

#[test]
fn steady_state_reuses_swapped_buffers() {
    let (mut producer, mut consumer) = FrameSlot::new(Resolution::new(4, 4)).split();
    let mut seen = HashSet::new();
    for i in 1..=16u16 {
        seen.insert(producer.back_buffer().as_ptr() as usize);
        producer.back_buffer().fill(i);
        producer.publish();
        if i % 3 != 0 {
            consumer.take_latest().unwrap();
        }
    }
    // 后台、共享槽、前台之间只做交换，不会出现新的缓冲区
    assert!(seen.len() <= 3, "{} distinct buffers", seen.len());
}

#[test]
fn wrong_frame_length_is_rejected() {
    let (mut producer, mut consumer) = FrameSlot::new(Resolution::new(4, 4)).split();
    let err = producer.write(&[0; 15]).unwrap_err();
    assert!(matches!(
        err,
        CameraError::FrameLength {
            expected: 16,
            actual: 15,
            ..
        }
    ));
    assert!(consumer.take_latest().is_none());
}

#[test]
fn producer_runs_on_another_thread() {
    let (mut producer, mut consumer) = FrameSlot::new(Resolution::new(8, 8)).split();
    let handle = thread::spawn(move || {
        for i in 1..=200u16 {
            producer.back_buffer().fill(i);
            producer.publish();
        }
    });

    let mut last = 0;
    let mut received = 0u64;
    loop {
        let finished = handle.is_finished();
        if let Some(frame) = consumer.take_latest() {
            // 帧内容与序号一致，序号单调递增
            let sequence = frame.sequence();
            assert!(sequence > last);
            assert!(frame.samples().data().iter().all(|&s| s as u64 == sequence));
            last = sequence;
            received += 1;
        }
        // 结束标志在取帧之前读取，最后一轮一定能取到最后一帧
        if finished {
            break;
        }
        thread::yield_now();
    }
    handle.join().unwrap();
    assert_eq!(last, 200);
    assert_eq!(received + consumer.skipped(), 200);
    assert!(consumer.is_disconnected());
}
