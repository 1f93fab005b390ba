//! 해시 기반 텍스트 지문 (placeholder 임베딩)
//!
//! 학습된 모델이 아니라 단어 빈도와 문자열 해시로 만드는 결정적 벡터입니다.
//! 같은 텍스트는 항상 비트 단위로 동일한 벡터를 만들지만,
//! 의미적 유사도는 보장하지 않습니다 (단어 겹침 정도만 반영).

use std::collections::HashMap;

/// 이 길이 이하의 단어는 버림
const MIN_WORD_LEN: usize = 2;

/// 단어별 가중치 계수
const FREQ_WEIGHT: f64 = 0.1;
const DIM_HASH_WEIGHT: f64 = 0.05;
const LENGTH_WEIGHT: f64 = 0.02;

/// 텍스트 전체 특성 계수
const TEXT_LEN_WEIGHT: f64 = 0.001;
const WORD_COUNT_WEIGHT: f64 = 0.002;

/// magnitude가 0일 때 대체 벡터 계수
const FALLBACK_WEIGHT: f64 = 0.01;

/// 다항식 롤링 해시 (승수 31, i32 wrapping)
///
/// UTF-16 코드 유닛 단위로 계산합니다.
pub fn string_hash(s: &str) -> i32 {
    extend_hash(0, s)
}

/// 기존 해시 값에 문자열을 이어서 해싱
///
/// `extend_hash(string_hash(a), b) == string_hash(a + b)`
fn extend_hash(seed: i32, s: &str) -> i32 {
    s.encode_utf16().fold(seed, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

/// 정규화: 소문자 변환 후 ASCII 영숫자, `_`, 공백 외의 문자는 공백으로 치환
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// 단어별 특성 (차원 루프 밖에서 한 번만 계산)
struct WordFeature {
    hash: f64,
    /// `hash(word + "_")` - 차원 번호를 이어 붙여 차원별 해시를 만듦
    dim_prefix: i32,
    freq: f64,
    log_freq: f64,
    len_weight: f64,
}

/// 텍스트 지문 벡터 생성
///
/// 결과는 L2 정규화되어 있습니다. 반복 호출 시 비트 단위로 동일합니다.
pub fn fingerprint(text: &str, dimension: usize) -> Vec<f64> {
    let normalized = normalize(text);
    let words: Vec<&str> = normalized
        .split_whitespace()
        .filter(|w| w.len() > MIN_WORD_LEN)
        .collect();

    // 첫 등장 순서를 유지해야 부동소수점 합산 순서가 고정됨
    let mut order: Vec<(&str, usize)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for word in &words {
        match positions.get(word) {
            Some(&pos) => order[pos].1 += 1,
            None => {
                positions.insert(word, order.len());
                order.push((word, 1));
            }
        }
    }

    let features: Vec<WordFeature> = order
        .iter()
        .map(|&(word, freq)| {
            let hash = string_hash(word);
            let freq = freq as f64;
            WordFeature {
                hash: f64::from(hash),
                dim_prefix: extend_hash(hash, "_"),
                freq,
                log_freq: (freq + 1.0).ln(),
                len_weight: word.len() as f64 / 10.0,
            }
        })
        .collect();

    let text_len = text.encode_utf16().count() as f64;
    let word_count = words.len() as f64;

    let mut vector = Vec::with_capacity(dimension);
    for i in 0..dimension {
        let di = i as f64;
        let suffix = i.to_string();
        let mut value = 0.0;

        for feature in &features {
            let dim_hash = f64::from(extend_hash(feature.dim_prefix, &suffix));
            value += (feature.hash + di).sin() * feature.freq * FREQ_WEIGHT;
            value += dim_hash.cos() * feature.log_freq * DIM_HASH_WEIGHT;
            value += feature.len_weight * (feature.hash * di).sin() * LENGTH_WEIGHT;
        }

        value += (text_len + di).sin() * TEXT_LEN_WEIGHT;
        value += (word_count + di).cos() * WORD_COUNT_WEIGHT;
        vector.push(value);
    }

    let magnitude = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if magnitude > 0.0 {
        for v in &mut vector {
            *v /= magnitude;
        }
        vector
    } else {
        (0..dimension)
            .map(|i| (i as f64).sin() * FALLBACK_WEIGHT)
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
