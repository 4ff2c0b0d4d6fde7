//! Integration tests for the presence-engine HTTP server

#[cfg(feature = "server")]
mod server_tests {
    use presence_engine::core::{ManualClock, Timestamp};
    use presence_engine::server::{run, ServerConfig};
    use presence_engine::source::{Detection, Landmark, PerceptionFrame};
    use presence_engine::{Config, FrameLoop, GeometricClassifier};
    use std::time::Duration;

    fn hand_frame() -> PerceptionFrame {
        PerceptionFrame::empty().with_hand(Detection::single(vec![Landmark::at(0.4, 0.4); 21]))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let frame_loop =
            FrameLoop::new(ManualClock::new(), GeometricClassifier::new(), &Config::default())
                .expect("Failed to create frame loop");

        // Start server
        let (addr, shutdown_tx) = run(ServerConfig::new(0), frame_loop.subscribe())
            .await
            .expect("Failed to start server");

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());

        // Shutdown server
        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_metrics_follow_the_frame_loop() {
        let clock = ManualClock::new();
        let mut frame_loop =
            FrameLoop::new(clock.clone(), GeometricClassifier::new(), &Config::default())
                .expect("Failed to create frame loop");

        let (addr, shutdown_tx) = run(ServerConfig::new(0), frame_loop.subscribe())
            .await
            .expect("Failed to start server");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let url = format!("http://{}/metrics", addr);

        let before: serde_json::Value = client
            .get(&url)
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(before["handPresence"], false);
        assert_eq!(before["handDetectionCounter"], 0);

        frame_loop.tick(Some(&hand_frame()));
        clock.set(Timestamp::from_millis(2_000));
        frame_loop.tick(Some(&PerceptionFrame::empty().with_hand(Detection::none())));

        let after: serde_json::Value = client
            .get(&url)
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(after["handPresence"], false);
        assert_eq!(after["handDetectionCounter"], 1);
        assert_eq!(after["handDetectionDuration"], 2.0);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_snapshot_endpoint() {
        let mut frame_loop =
            FrameLoop::new(ManualClock::new(), GeometricClassifier::new(), &Config::default())
                .expect("Failed to create frame loop");
        frame_loop.tick(Some(&hand_frame()));

        let (addr, shutdown_tx) = run(ServerConfig::new(0), frame_loop.subscribe())
            .await
            .expect("Failed to start server");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let body: serde_json::Value = reqwest::Client::new()
            .get(format!("http://{}/snapshot", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");

        assert_eq!(body["frame_index"], 1);
        assert_eq!(body["signals"][0]["signal"], "hand");
        assert_eq!(body["signals"][0]["presence"], true);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let frame_loop =
            FrameLoop::new(ManualClock::new(), GeometricClassifier::new(), &Config::default())
                .expect("Failed to create frame loop");

        let (addr, shutdown_tx) = run(ServerConfig::new(0), frame_loop.subscribe())
            .await
            .expect("Failed to start server");
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Send OPTIONS request to check CORS
        let client = reqwest::Client::new();
        let response = client
            .request(reqwest::Method::OPTIONS, format!("http://{}/metrics", addr))
            .header("Origin", "http://localhost")
            .header("Access-Control-Request-Method", "GET")
            .send()
            .await
            .expect("Failed to send request");

        // CORS preflight should succeed
        assert!(
            response.status().is_success() || response.status() == reqwest::StatusCode::NO_CONTENT,
            "CORS preflight failed: {}",
            response.status()
        );
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("http://localhost")
        );

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_cors_rejects_foreign_origin() {
        let frame_loop =
            FrameLoop::new(ManualClock::new(), GeometricClassifier::new(), &Config::default())
                .expect("Failed to create frame loop");

        let (addr, shutdown_tx) = run(ServerConfig::new(0), frame_loop.subscribe())
            .await
            .expect("Failed to start server");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let preflight = client
            .request(reqwest::Method::OPTIONS, format!("http://{}/metrics", addr))
            .header("Origin", "http://evil.example")
            .header("Access-Control-Request-Method", "GET")
            .send()
            .await
            .expect("Failed to send request");
        assert!(preflight
            .headers()
            .get("access-control-allow-origin")
            .is_none());

        let response = client
            .get(format!("http://{}/metrics", addr))
            .header("Origin", "http://evil.example")
            .send()
            .await
            .expect("Failed to send request");
        assert!(response
            .headers()
            .get("access-control-allow-origin")
            .is_none());

        let _ = shutdown_tx.send(());
    }
}
