use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audio::AudioAcquirer;
use crate::cache::{transcript_key, CacheStore, CachedValue, DEFAULT_TTL};
use crate::captions::CaptionFetcher;
use crate::extractors::{extract_video_id, VideoId};
use crate::utils::format_duration;
use crate::ScribeError;

use super::{SpeechTranscriber, TranscriptPair, WorkerPool};

/// Fetches captions and transcribes audio for a video, with caching.
///
/// Caption retrieval and audio download run in parallel on the worker pool;
/// transcription follows once the audio is on disk. The temporary audio file is
/// removed before the call returns, whatever the outcome.
pub struct TranscriptionPipeline {
    captions: CaptionFetcher,
    audio: AudioAcquirer,
    transcriber: SpeechTranscriber,
    cache: Arc<dyn CacheStore>,
    pool: WorkerPool,
    ttl: Duration,
}

impl TranscriptionPipeline {
    pub fn new(
        captions: CaptionFetcher,
        audio: AudioAcquirer,
        transcriber: SpeechTranscriber,
        cache: Arc<dyn CacheStore>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            captions,
            audio,
            transcriber,
            cache,
            pool,
            ttl: DEFAULT_TTL,
        }
    }

    /// Override the cache entry lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Video title, looked up on the worker pool
    pub async fn fetch_title(&self, reference: &str) -> anyhow::Result<String> {
        let audio = self.audio.clone();
        let reference = reference.to_string();
        self.pool.run(move || audio.fetch_title(&reference)).await?
    }

    /// Captions and speech-to-text transcript for `reference` in `language`.
    ///
    /// Fails with `InvalidReference` for unrecognized URLs; every other failure is
    /// reported as `PipelineFailure` carrying the underlying cause.
    pub async fn get_transcriptions(
        &self,
        reference: &str,
        language: &str,
    ) -> Result<TranscriptPair, ScribeError> {
        let video = extract_video_id(reference)
            .ok_or_else(|| ScribeError::InvalidReference(reference.to_string()))?;

        let cache_key = transcript_key(&video, language);
        if let Some(CachedValue::Transcripts(pair)) = self.cache.get(&cache_key) {
            tracing::info!("Using cached transcriptions for {}", video);
            return Ok(pair);
        }

        let started = Instant::now();
        let pair = self
            .fetch(&video, reference, language)
            .await
            .map_err(|e| match e {
                ScribeError::PipelineFailure(_) => e,
                other => ScribeError::PipelineFailure(other.to_string()),
            })?;

        tracing::info!(
            "Transcriptions for {} ready in {} (captions: {} chars, whisper: {} chars)",
            video,
            format_duration(started.elapsed().as_secs_f64()),
            pair.captions_text.len(),
            pair.whisper_text.len()
        );

        if let Err(e) = self
            .cache
            .set(&cache_key, CachedValue::Transcripts(pair.clone()), self.ttl)
        {
            tracing::warn!("Failed to cache transcriptions for {}: {:#}", video, e);
        }

        Ok(pair)
    }

    /// Blocking adapter for callers outside the async runtime
    pub fn get_transcriptions_blocking(
        &self,
        runtime: &tokio::runtime::Runtime,
        reference: &str,
        language: &str,
    ) -> Result<TranscriptPair, ScribeError> {
        runtime.block_on(self.get_transcriptions(reference, language))
    }

    async fn fetch(
        &self,
        video: &VideoId,
        reference: &str,
        language: &str,
    ) -> Result<TranscriptPair, ScribeError> {
        let captions = self.captions.clone();
        let caption_video = video.clone();
        let caption_language = language.to_string();

        let audio = self.audio.clone();
        let audio_reference = reference.to_string();

        tracing::info!("Fetching captions and audio for {}", video);
        let (captions_result, audio_result) = futures_util::future::join(
            self.pool
                .run(move || captions.fetch_captions(&caption_video, &caption_language)),
            self.pool.run(move || audio.download_audio(&audio_reference)),
        )
        .await;

        // An artifact from a finished download is dropped (and deleted) on early return
        let captions_text = captions_result.map_err(|e| {
            ScribeError::PipelineFailure(format!("caption task failed: {:#}", e))
        })?;
        let artifact = audio_result.map_err(|e| {
            ScribeError::PipelineFailure(format!("audio task failed: {:#}", e))
        })??;

        let transcriber = self.transcriber.clone();
        let transcribed = self
            .pool
            .run(move || {
                let text = transcriber.transcribe(&artifact);
                (artifact, text)
            })
            .await;

        let whisper_text = match transcribed {
            Ok((artifact, text)) => {
                // Failures are logged by discard itself
                let _ = artifact.discard();
                text?
            }
            Err(e) => {
                return Err(ScribeError::PipelineFailure(format!(
                    "transcription task failed: {:#}",
                    e
                )))
            }
        };

        let pair = TranscriptPair {
            captions_text,
            whisper_text,
        };

        if pair.is_empty() {
            return Err(ScribeError::PipelineFailure(
                "both captions and transcription failed".to_string(),
            ));
        }

        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioAcquirer, DownloadOptions, MockMediaDownloader};
    use crate::cache::{MemoryCache, MockCacheStore};
    use crate::captions::{CaptionSnippet, CaptionSourceError, MockCaptionSource};
    use crate::config::DeploymentMode;
    use crate::transcribe::{MockSpeechModel, SpeechModel};
    use std::path::Path;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Mutex};
    use tempfile::TempDir;

    const REFERENCE: &str = "https://www.youtube.com/watch?v=abc123";

    fn snippets(text: &str) -> Vec<CaptionSnippet> {
        vec![CaptionSnippet {
            text: text.to_string(),
            start: 0.0,
            duration: 1.0,
        }]
    }

    fn writes_file(
        seen: Arc<Mutex<Vec<PathBuf>>>,
    ) -> impl FnMut(&str, &DownloadOptions) -> anyhow::Result<PathBuf> + Send + 'static {
        move |_, options| {
            std::fs::write(&options.output, b"audio")?;
            seen.lock().unwrap().push(options.output.clone());
            Ok(options.output.clone())
        }
    }

    fn model(text: &'static str) -> MockSpeechModel {
        let mut model = MockSpeechModel::new();
        model.expect_name().return_const("mock".to_string());
        model.expect_transcribe_file().returning(move |path| {
            assert!(path.is_file(), "transcription started before the download finished");
            Ok(text.to_string())
        });
        model
    }

    struct PanickingModel;

    impl SpeechModel for PanickingModel {
        fn transcribe_file(&self, _audio: &Path) -> anyhow::Result<String> {
            panic!("out of memory")
        }

        fn name(&self) -> String {
            "panicking".to_string()
        }
    }

    fn pipeline(
        source: MockCaptionSource,
        downloader: MockMediaDownloader,
        model: impl SpeechModel + 'static,
        cache: Arc<dyn CacheStore>,
        temp: &TempDir,
    ) -> TranscriptionPipeline {
        TranscriptionPipeline::new(
            CaptionFetcher::new(Arc::new(source)),
            AudioAcquirer::new(
                Arc::new(downloader),
                temp.path().to_path_buf(),
                temp.path().join("media"),
                DeploymentMode::Production,
            ),
            SpeechTranscriber::new(Arc::new(model)),
            cache,
            WorkerPool::new(2),
        )
    }

    #[tokio::test]
    async fn test_success_returns_pair_and_removes_audio() {
        let temp = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut source = MockCaptionSource::new();
        source
            .expect_get_transcript()
            .returning(|_, _| Ok(snippets("caption text")));
        let mut downloader = MockMediaDownloader::new();
        downloader.expect_download().returning(writes_file(Arc::clone(&seen)));
        let cache = Arc::new(MemoryCache::new());

        let pipeline = pipeline(source, downloader, model("  spoken text \n"), cache.clone(), &temp);
        let pair = pipeline.get_transcriptions(REFERENCE, "en").await.unwrap();

        assert_eq!(pair.captions_text, "caption text");
        assert_eq!(pair.whisper_text, "spoken text");

        let downloaded = seen.lock().unwrap().clone();
        assert_eq!(downloaded.len(), 1);
        assert!(!downloaded[0].exists());

        assert_eq!(
            cache.get("transcriptions:abc123:en"),
            Some(CachedValue::Transcripts(pair))
        );
    }

    #[tokio::test]
    async fn test_cache_hit_skips_all_work() {
        let temp = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut source = MockCaptionSource::new();
        source
            .expect_get_transcript()
            .times(1)
            .returning(|_, _| Ok(snippets("caption text")));
        let mut downloader = MockMediaDownloader::new();
        downloader
            .expect_download()
            .times(1)
            .returning(writes_file(Arc::clone(&seen)));

        let pipeline = pipeline(source, downloader, model("spoken"), Arc::new(MemoryCache::new()), &temp);

        let first = pipeline.get_transcriptions(REFERENCE, "en").await.unwrap();
        // Short link to the same video hits the same entry
        let second = pipeline
            .get_transcriptions("https://youtu.be/abc123", "en")
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_both_empty_fails_and_is_not_cached() {
        let temp = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut source = MockCaptionSource::new();
        source
            .expect_get_transcript()
            .returning(|_, _| Err(CaptionSourceError::TranscriptsDisabled));
        let mut downloader = MockMediaDownloader::new();
        downloader.expect_download().returning(writes_file(Arc::clone(&seen)));
        let mut cache = MockCacheStore::new();
        cache.expect_get().returning(|_| None);
        cache.expect_set().times(0);

        let pipeline = pipeline(source, downloader, model("   "), Arc::new(cache), &temp);
        let err = pipeline.get_transcriptions(REFERENCE, "en").await.unwrap_err();

        assert_eq!(
            err,
            ScribeError::PipelineFailure("both captions and transcription failed".into())
        );
        assert!(!seen.lock().unwrap()[0].exists());
    }

    #[tokio::test]
    async fn test_captions_only_still_succeeds() {
        let temp = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut source = MockCaptionSource::new();
        source
            .expect_get_transcript()
            .returning(|_, _| Ok(snippets("only captions")));
        let mut downloader = MockMediaDownloader::new();
        downloader.expect_download().returning(writes_file(seen));

        let pipeline = pipeline(source, downloader, model(""), Arc::new(MemoryCache::new()), &temp);
        let pair = pipeline.get_transcriptions(REFERENCE, "en").await.unwrap();
        assert_eq!(pair.captions_text, "only captions");
        assert!(pair.whisper_text.is_empty());
    }

    #[tokio::test]
    async fn test_download_failure_skips_transcription() {
        let temp = TempDir::new().unwrap();

        let mut source = MockCaptionSource::new();
        source
            .expect_get_transcript()
            .returning(|_, _| Ok(snippets("caption text")));
        let mut downloader = MockMediaDownloader::new();
        downloader
            .expect_download()
            .returning(|_, _| Err(anyhow::anyhow!("Video unavailable")));
        let mut model = MockSpeechModel::new();
        model.expect_transcribe_file().times(0);
        let cache = Arc::new(MemoryCache::new());

        let pipeline = pipeline(source, downloader, model, cache.clone(), &temp);
        let err = pipeline.get_transcriptions(REFERENCE, "en").await.unwrap_err();

        match err {
            ScribeError::PipelineFailure(msg) => {
                assert!(msg.contains("Audio download failed"));
                assert!(msg.contains("Video unavailable"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(cache.is_empty());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_transcription_failure_still_removes_audio() {
        let temp = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut source = MockCaptionSource::new();
        source
            .expect_get_transcript()
            .returning(|_, _| Ok(snippets("caption text")));
        let mut downloader = MockMediaDownloader::new();
        downloader.expect_download().returning(writes_file(Arc::clone(&seen)));
        let mut model = MockSpeechModel::new();
        model.expect_name().return_const("mock".to_string());
        model
            .expect_transcribe_file()
            .returning(|_| Err(anyhow::anyhow!("model crashed")));

        let pipeline = pipeline(source, downloader, model, Arc::new(MemoryCache::new()), &temp);
        let err = pipeline.get_transcriptions(REFERENCE, "en").await.unwrap_err();

        assert_eq!(
            err,
            ScribeError::PipelineFailure("Transcription failed: model crashed".into())
        );
        assert!(!seen.lock().unwrap()[0].exists());
    }

    #[tokio::test]
    async fn test_panicking_transcription_does_not_leak_audio() {
        let temp = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut source = MockCaptionSource::new();
        source.expect_get_transcript().returning(|_, _| Ok(snippets("c")));
        let mut downloader = MockMediaDownloader::new();
        downloader.expect_download().returning(writes_file(Arc::clone(&seen)));
        let pipeline = pipeline(source, downloader, PanickingModel, Arc::new(MemoryCache::new()), &temp);
        let err = pipeline.get_transcriptions(REFERENCE, "en").await.unwrap_err();

        assert!(matches!(err, ScribeError::PipelineFailure(_)));
        assert!(!seen.lock().unwrap()[0].exists());
    }

    #[tokio::test]
    async fn test_invalid_reference_does_no_work() {
        let temp = TempDir::new().unwrap();
        let mut source = MockCaptionSource::new();
        source.expect_get_transcript().times(0);
        let mut downloader = MockMediaDownloader::new();
        downloader.expect_download().times(0);
        let mut cache = MockCacheStore::new();
        cache.expect_get().times(0);

        let pipeline = pipeline(source, downloader, MockSpeechModel::new(), Arc::new(cache), &temp);
        let err = pipeline
            .get_transcriptions("https://example.com/x", "en")
            .await
            .unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(err, ScribeError::InvalidReference("https://example.com/x".into()));
    }

    #[tokio::test]
    async fn test_captions_and_download_overlap() {
        let temp = TempDir::new().unwrap();
        let (to_download, from_captions) = mpsc::channel::<()>();
        let (to_captions, from_download) = mpsc::channel::<()>();
        let captions_saw_download = Arc::new(AtomicBool::new(false));
        let download_saw_captions = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&captions_saw_download);
        let to_download = Mutex::new(to_download);
        let from_download = Mutex::new(from_download);
        let mut source = MockCaptionSource::new();
        source.expect_get_transcript().returning(move |_, _| {
            let _ = to_download.lock().unwrap().send(());
            let overlapped = from_download
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(5))
                .is_ok();
            flag.store(overlapped, Ordering::SeqCst);
            Ok(snippets("captions"))
        });

        let flag = Arc::clone(&download_saw_captions);
        let to_captions = Mutex::new(to_captions);
        let from_captions = Mutex::new(from_captions);
        let mut downloader = MockMediaDownloader::new();
        downloader.expect_download().returning(move |_, options| {
            let _ = to_captions.lock().unwrap().send(());
            let overlapped = from_captions
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(5))
                .is_ok();
            flag.store(overlapped, Ordering::SeqCst);
            std::fs::write(&options.output, b"audio")?;
            Ok(options.output.clone())
        });

        let pipeline = pipeline(source, downloader, model("spoken"), Arc::new(MemoryCache::new()), &temp);
        pipeline.get_transcriptions(REFERENCE, "en").await.unwrap();

        assert!(captions_saw_download.load(Ordering::SeqCst));
        assert!(download_saw_captions.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_title_lookup_waits_for_a_worker() {
        let temp = TempDir::new().unwrap();
        let mut downloader = MockMediaDownloader::new();
        downloader
            .expect_fetch_title()
            .times(1)
            .returning(|_| Ok("Rust in Production".to_string()));
        let pipeline = TranscriptionPipeline::new(
            CaptionFetcher::new(Arc::new(MockCaptionSource::new())),
            AudioAcquirer::new(
                Arc::new(downloader),
                temp.path().to_path_buf(),
                temp.path().join("media"),
                DeploymentMode::Production,
            ),
            SpeechTranscriber::new(Arc::new(MockSpeechModel::new())),
            Arc::new(MemoryCache::new()),
            WorkerPool::new(1),
        );

        // Occupy the only worker; the lookup must queue behind it
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let pool = pipeline.pool.clone();
        let holder = tokio::spawn(async move {
            pool.run(move || {
                let _ = started_tx.send(());
                let _ = release_rx.recv();
            })
            .await
        });
        started_rx.await.unwrap();

        let lookup = pipeline.fetch_title(REFERENCE);
        tokio::pin!(lookup);
        assert!(tokio::time::timeout(std::time::Duration::from_millis(50), &mut lookup)
            .await
            .is_err());

        release_tx.send(()).unwrap();
        holder.await.unwrap().unwrap();
        assert_eq!(lookup.await.unwrap(), "Rust in Production");
    }

    #[test]
    fn test_blocking_adapter() {
        let temp = TempDir::new().unwrap();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let pipeline = pipeline(
            MockCaptionSource::new(),
            MockMediaDownloader::new(),
            MockSpeechModel::new(),
            Arc::new(MemoryCache::new()),
            &temp,
        );

        let err = pipeline
            .get_transcriptions_blocking(&runtime, "not a url", "en")
            .unwrap_err();
        assert!(matches!(err, ScribeError::InvalidReference(_)));
    }
}
