//! 텍스트 생성 모듈 - 검색된 컨텍스트로 답변 생성
//!
//! 답변 생성 모델은 이 크레이트 범위 밖이므로 [`TextGenerator`] 트레이트로
//! 경계를 두고, Gemini `generateContent` 어댑터를 제공합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let generator = GeminiGenerator::from_env(&config.generation)?;
//! let answer = generator.generate("연차는 며칠인가요?", &contexts).await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::GenerationConfig;
use crate::error::{RagError, Result};

/// 컨텍스트가 없을 때 프롬프트에 넣는 문구
pub const NO_CONTEXT: &str = "No relevant documents found.";

/// 모델이 빈 응답을 줄 때 대체 답변
pub const EMPTY_RESPONSE: &str = "I apologize, but I couldn't generate a response.";

const PROMPT_PREAMBLE: &str = "You are a helpful AI assistant for internal company documentation. \
Your role is to answer questions based on the provided context from uploaded documents.

Instructions:
1. Answer questions using only the information provided in the context
2. If the context doesn't contain relevant information, clearly state that you cannot find the answer in the uploaded documents
3. Be concise but comprehensive in your responses
4. When referencing information, indicate which document it came from if possible
5. If multiple documents contain relevant information, synthesize the information appropriately";

// ============================================================================
// TextGenerator Trait
// ============================================================================

/// 텍스트 생성기 트레이트
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 질의와 컨텍스트로 답변 생성
    async fn generate(&self, query: &str, contexts: &[String]) -> Result<String>;

    /// 생성기 이름
    fn name(&self) -> &str;
}

/// 답변 생성 프롬프트 구성
///
/// 컨텍스트는 빈 줄로 이어 붙이고, 없으면 [`NO_CONTEXT`]를 넣습니다.
pub fn build_prompt(query: &str, contexts: &[String]) -> String {
    let context_text = if contexts.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        contexts.join("\n\n")
    };

    format!(
        "{}\n\nContext from uploaded documents:\n{}\n\nQuestion: {}",
        PROMPT_PREAMBLE, context_text, query
    )
}

// ============================================================================
// Google Gemini Generation
// ============================================================================

/// Gemini API 베이스 URL
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Rate Limiter 설정 (분당 요청 수)
const RATE_LIMIT_RPM: u32 = 60;
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
/// 호출 간 최소 딜레이
const MIN_DELAY_MS: u64 = 1000;
/// 재시도 시 초기 백오프 (ms)
const INITIAL_BACKOFF_MS: u64 = 2000;
const MAX_BACKOFF_MS: u64 = 60_000;

/// Gemini 텍스트 생성 구현체
#[derive(Debug)]
pub struct GeminiGenerator {
    api_key: String,
    model: String,
    max_retries: u32,
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

/// Rate Limiter with minimum delay between requests
#[derive(Debug)]
struct RateLimiter {
    requests: Vec<Instant>,
    max_requests: u32,
    window: Duration,
    min_delay: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    fn new(max_requests: u32, window: Duration, min_delay: Duration) -> Self {
        Self {
            requests: Vec::new(),
            max_requests,
            window,
            min_delay,
            last_request: None,
        }
    }

    /// 요청 가능 여부 확인 및 대기
    async fn acquire(&mut self) {
        // 1. 최소 딜레이 적용 (버스트 방지)
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let wait_time = self.min_delay - elapsed;
                tracing::debug!("Min delay: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        // 2. 윈도우 밖의 오래된 요청 제거
        let now = Instant::now();
        self.requests.retain(|&t| now.duration_since(t) < self.window);

        // 3. Rate limit 초과 시 가장 오래된 요청이 윈도우를 벗어날 때까지 대기
        if self.requests.len() >= self.max_requests as usize {
            if let Some(&oldest) = self.requests.first() {
                let wait_time = self.window.saturating_sub(now.duration_since(oldest));
                if !wait_time.is_zero() {
                    tracing::debug!("Rate limit reached, waiting {:?}", wait_time);
                    tokio::time::sleep(wait_time).await;
                }
                let now = Instant::now();
                self.requests.retain(|&t| now.duration_since(t) < self.window);
            }
        }

        let now = Instant::now();
        self.requests.push(now);
        self.last_request = Some(now);
    }
}

impl GeminiGenerator {
    /// 새 Gemini 생성기
    ///
    /// # Arguments
    /// * `api_key` - Google AI API 키
    /// * `config` - 모델 이름, 요청 제한 시간, 재시도 횟수
    pub fn new(api_key: String, config: &GenerationConfig) -> anyhow::Result<Self> {
        if config.model.trim().is_empty() {
            anyhow::bail!("Gemini model name must not be empty");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let rate_limiter = Arc::new(Mutex::new(RateLimiter::new(
            RATE_LIMIT_RPM,
            RATE_LIMIT_WINDOW,
            Duration::from_millis(MIN_DELAY_MS),
        )));

        Ok(Self {
            api_key,
            model: config.model.clone(),
            max_retries: config.max_retries,
            client,
            rate_limiter,
        })
    }

    /// 환경변수에서 API 키를 읽어 생성
    ///
    /// 우선순위: GEMINI_API_KEY > GOOGLE_AI_API_KEY
    pub fn from_env(config: &GenerationConfig) -> anyhow::Result<Self> {
        let api_key = get_api_key()?;
        let generator = Self::new(api_key, config)?;
        tracing::info!("Using Gemini generation (model: {})", generator.model);
        Ok(generator)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.model)
    }

    /// 프롬프트 전송 (429/전송 에러는 지수 백오프로 재시도)
    async fn request(&self, prompt: &str) -> anyhow::Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let mut last_error: Option<anyhow::Error> = None;

        for attempt in 0..=self.max_retries {
            {
                let mut limiter = self.rate_limiter.lock().await;
                limiter.acquire().await;
            }

            // API 키는 URL이 아닌 헤더로 전송
            let response = match self
                .client
                .post(self.endpoint())
                .header("x-goog-api-key", &self.api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(anyhow::anyhow!("Failed to send generation request: {}", e));
                    if attempt < self.max_retries {
                        let backoff = backoff(attempt);
                        tracing::warn!(
                            "Request failed, retrying in {:?} (attempt {}/{})",
                            backoff,
                            attempt + 1,
                            self.max_retries
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();
            let body = response
                .text()
                .await
                .context("Failed to read response body")?;

            if status.is_success() {
                return parse_response(&body);
            }

            if status.as_u16() == 429 {
                last_error = Some(anyhow::anyhow!("Rate limit exceeded (429)"));
                if attempt < self.max_retries {
                    let backoff = backoff(attempt);
                    tracing::warn!(
                        "Rate limit hit (429), backing off {:?} (attempt {}/{})",
                        backoff,
                        attempt + 1,
                        self.max_retries
                    );
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            } else {
                if let Ok(error) = serde_json::from_str::<GeminiError>(&body) {
                    anyhow::bail!(
                        "Gemini API error ({}): {}",
                        error.error.status,
                        error.error.message
                    );
                }
                anyhow::bail!("Gemini API error ({}): {}", status, body);
            }
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!("Generation failed after {} retries", self.max_retries)
        }))
    }
}

fn backoff(attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(INITIAL_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

/// 응답 본문에서 첫 후보의 텍스트 추출 (비어 있으면 대체 답변)
fn parse_response(body: &str) -> anyhow::Result<String> {
    let response: GenerateResponse =
        serde_json::from_str(body).context("Failed to parse generation response")?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        Ok(EMPTY_RESPONSE.to_string())
    } else {
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, query: &str, contexts: &[String]) -> Result<String> {
        let prompt = build_prompt(query, contexts);
        self.request(&prompt)
            .await
            .map_err(|e| RagError::Generation(format!("{:#}", e)))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// generateContent 요청 본문
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

/// generateContent 응답
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Gemini API 에러 응답
#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[serde(default)]
    status: String,
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (환경변수에서)
///
/// 우선순위:
/// 1. `GEMINI_API_KEY` 환경변수
/// 2. `GOOGLE_AI_API_KEY` 환경변수
pub fn get_api_key() -> anyhow::Result<String> {
    for var in ["GEMINI_API_KEY", "GOOGLE_AI_API_KEY"] {
        if let Ok(key) = std::env::var(var) {
            if !key.is_empty() {
                tracing::debug!("Using API key from {}", var);
                return Ok(key);
            }
        }
    }

    anyhow::bail!(
        "API key not found. Set GEMINI_API_KEY or GOOGLE_AI_API_KEY environment variable.\n\
         Get your API key at: https://aistudio.google.com/app/apikey"
    )
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    get_api_key().is_ok()
}

// ============================================================================
// Tests
// ============================================================================
