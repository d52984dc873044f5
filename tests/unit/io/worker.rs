//! Tests for background generation jobs and the authoritative job handle

#[cfg(test)]
mod tests {
    use greedylayers::GenerationError;
    use greedylayers::algorithm::executor::GenerationConfig;
    use greedylayers::catalog::model::Catalog;
    use greedylayers::catalog::request::{LayerSpec, PieceSpec, RunRequest};
    use greedylayers::io::message::WorkerMessage;
    use greedylayers::io::worker::{GenerationJob, Generator};
    use std::sync::Arc;

    fn request(layers: usize, pieces: usize, size: usize) -> RunRequest {
        let layers = (0..layers)
            .map(|layer| LayerSpec {
                id: format!("L{layer}"),
                required: true,
                pieces: (0..pieces)
                    .map(|piece| PieceSpec {
                        id: format!("L{layer}-p{piece}"),
                        ..PieceSpec::default()
                    })
                    .collect(),
                ..LayerSpec::default()
            })
            .collect();
        RunRequest {
            layers,
            size,
            favorites: serde_json::from_str(r#"{ "fav": ["L0-p0", "L1-p1"] }"#)
                .expect("Failed to decode favorites"),
        }
    }

    fn config(flush_threshold: usize) -> GenerationConfig {
        GenerationConfig {
            flush_threshold,
            failure_bound: Some(10_000),
            ..GenerationConfig::default()
        }
    }

    // Tests a job streams every image and then finishes
    // Verified by skipping the finish message
    #[test]
    fn test_job_streams_to_completion() {
        let request = request(3, 4, 20);
        let catalog = Arc::new(Catalog::from_request(&request).expect("Failed to build catalog"));
        let mut job = GenerationJob::spawn(7, catalog, &request.favorites, request.size, config(6))
            .expect("Failed to spawn job");
        assert_eq!(job.id(), 7);
        assert_eq!(job.size(), 20);

        let mut collection = job.collection();
        let mut updates = 0;
        let summary = job
            .drain(&mut collection, |_| updates += 1)
            .expect("Job should finish");

        assert_eq!(updates, 4);
        assert!(summary.is_complete());
        assert_eq!(collection.received(), 20);
        let favorite = collection
            .images()
            .iter()
            .find(|entry| entry.image.favorite() == Some("fav"))
            .expect("Favorite image should be received");
        assert_eq!(
            favorite.image.attribute_ids(collection.catalog()),
            vec!["L0-p0", "L1-p1"]
        );
        assert!(job.join().is_err());
    }

    // Tests a cancelled job stops without a finish message
    // Verified by ignoring the cancel flag in the job loop
    #[test]
    fn test_cancelled_job_disconnects() {
        let request = request(4, 30, 200_000);
        let mut generator = Generator::new(config(1));
        let job = generator.start(&request).expect("Failed to start job");
        job.cancel();
        assert!(job.is_cancelled());

        let mut collection = job.collection();
        let result = job.drain(&mut collection, |_| {});
        assert!(matches!(result, Err(GenerationError::JobDisconnected { .. })));
        assert!(collection.received() < 200_000);
    }

    // Tests starting a new request replaces the authoritative job
    // Verified by keeping the first job after a restart
    #[test]
    fn test_generator_restart() {
        let first = request(2, 3, 5);
        let second = request(2, 3, 6);
        let mut generator = Generator::new(config(2));
        assert!(generator.current().is_none());

        let first_id = generator.start(&first).expect("Failed to start job").id();
        assert!(generator.is_current(&first));
        assert!(!generator.is_current(&second));

        let second_id = generator.start(&second).expect("Failed to start job").id();
        assert_ne!(first_id, second_id);
        assert_eq!(generator.current().map(GenerationJob::id), Some(second_id));
        assert!(generator.is_current(&second));
        assert_eq!(generator.config().flush_threshold, 2);

        let mut changed_favorites = second.clone();
        changed_favorites.favorites.insert("other", vec!["L0-p2".to_string()]);
        assert!(!generator.is_current(&changed_favorites));

        let job = generator.current_mut().expect("Job should be running");
        let mut collection = job.collection();
        job.drain(&mut collection, |_| {}).expect("Job should finish");
        assert_eq!(collection.received(), 6);

        generator.cancel();
        assert!(generator.current().is_none());
        assert!(!generator.is_current(&second));
    }

    // Tests messages can be polled without blocking
    // Verified by making try_recv block on the channel
    #[test]
    fn test_try_recv_polls() {
        let request = request(2, 2, 2);
        let mut generator = Generator::new(config(10));
        let job = generator.start(&request).expect("Failed to start job");

        let mut finished = false;
        while !finished {
            match job.try_recv() {
                Some(WorkerMessage::Finish) => finished = true,
                Some(WorkerMessage::Update { images }) => assert!(!images.is_empty()),
                None => std::thread::yield_now(),
            }
        }
        assert!(job.recv().is_none());
    }
}
