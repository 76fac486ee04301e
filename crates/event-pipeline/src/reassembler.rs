//! 이벤트 재조립기 -- 물리 라인을 논리 이벤트로 묶습니다.
//!
//! 스택 트레이스처럼 여러 줄에 걸친 로그는 라인 단위 전송에서 쪼개져
//! 도착합니다. [`EventReassembler`]는 경계 정규식으로 새 이벤트의 시작
//! 라인을 판별하여, 경계가 나타날 때까지의 라인들을 하나의 이벤트
//! 본문으로 누적합니다.
//!
//! # 알고리즘
//! 누적 버퍼 하나를 유지합니다. 라인이 경계에 매칭되고 버퍼가 비어있지
//! 않으면 버퍼를 완성된 이벤트로 방출하고 새 라인으로 버퍼를 시작합니다.
//! 그 외에는 라인을 개행으로 이어붙입니다. 미리보기(lookahead)는 없으며,
//! 스트림 종료나 유휴 타임아웃 시 [`flush`](EventReassembler::flush)로
//! 잔여 버퍼를 정확히 한 번 방출합니다.
//!
//! 연결(스트림)마다 인스턴스 하나를 소유합니다. 재시작할 수 없습니다.

use regex::Regex;

/// 기본 경계 패턴 — 선행 날짜 스탬프 (`YYYY-MM-DD`)
pub const DEFAULT_BOUNDARY_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}";

/// 라인 → 논리 이벤트 재조립기
pub struct EventReassembler {
    /// 새 이벤트 시작 판별 정규식
    boundary: Regex,
    /// 현재 누적 중인 이벤트 본문
    buffer: String,
}

impl EventReassembler {
    /// 경계 정규식으로 새 재조립기를 생성합니다.
    pub fn new(boundary: Regex) -> Self {
        Self {
            boundary,
            buffer: String::new(),
        }
    }

    /// 기본 경계 패턴(선행 날짜 스탬프)으로 재조립기를 생성합니다.
    pub fn with_default_boundary() -> Self {
        // 상수 패턴이므로 컴파일은 실패할 수 없습니다.
        Self::new(Regex::new(DEFAULT_BOUNDARY_PATTERN).expect("default boundary pattern is valid"))
    }

    /// 라인이 새 이벤트의 시작인지 판별합니다.
    pub fn is_event_start(&self, line: &str) -> bool {
        self.boundary.is_match(line)
    }

    /// 라인 하나를 밀어 넣습니다.
    ///
    /// 완성된 이벤트가 생기면 `Some(body)`를 반환합니다. 반환 시점에
    /// 버퍼는 이미 새 라인으로 교체되어 있습니다.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if self.is_event_start(line) && !self.buffer.is_empty() {
            let completed = std::mem::replace(&mut self.buffer, line.to_owned());
            return Some(completed);
        }

        if self.buffer.is_empty() {
            self.buffer.push_str(line);
        } else {
            self.buffer.push('\n');
            self.buffer.push_str(line);
        }
        None
    }

    /// 누적 중인 잔여 이벤트를 방출합니다.
    ///
    /// 스트림 종료 또는 유휴 타임아웃 시 호출합니다. 버퍼가 비어있으면
    /// `None`을 반환합니다 (빈 이벤트는 방출하지 않음).
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.buffer))
    }

    /// 버퍼에 누적 중인 바이트 수를 반환합니다.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// 누적 중인 내용이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
