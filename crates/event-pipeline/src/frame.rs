//! 프레임 파서 -- 필드 구분 프레임 문법 해석
//!
//! 업스트림이 한 줄에 한 이벤트를 미리 패킹해 보내는 전송을 위한
//! 파서입니다. 프레임 문법은 명시적 레코드 종료 마커를 가집니다:
//!
//! ```text
//! time=<t>|meta=<m>|host=<h>|sourcetype=<st>|source=<s>|index=<i>|<event>###END###
//! ```
//!
//! 프레임 정규식에 매칭되지 않는 라인은 해당 라인에 대해 아무 것도
//! 방출하지 않습니다 (드롭, 진단 로그만 남김).

use regex::Regex;

use logrelay_core::types::LogEvent;

/// 레코드 종료 마커
pub const END_MARKER: &str = "###END###";

/// 프레임 문법 정규식 소스
const FRAME_PATTERN: &str = r"time=(?P<time>.*?)\|meta=(?P<meta>.*?)\|host=(?P<host>.*?)\|sourcetype=(?P<sourcetype>.*?)\|source=(?P<source>.*?)\|index=(?P<index>.*?)\|(?P<event>.*?)###END###$";

/// 프레임 파서
///
/// 라인 하나를 독립적으로 해석하여 [`LogEvent`]를 만듭니다.
/// 정규식은 생성 시 한 번만 컴파일합니다.
pub struct FrameParser {
    /// 컴파일된 프레임 정규식
    regex: Regex,
}

impl FrameParser {
    /// 새 프레임 파서를 생성합니다.
    pub fn new() -> Self {
        // 상수 패턴이므로 컴파일은 실패할 수 없습니다.
        Self {
            regex: Regex::new(FRAME_PATTERN).expect("frame pattern is valid"),
        }
    }

    /// 라인 하나를 프레임 문법으로 해석합니다.
    ///
    /// 매칭되면 헤더 필드가 채워진 이벤트를, 매칭되지 않으면 `None`을
    /// 반환합니다. `fields`는 빈 맵으로 시작합니다 — 추출은 이후
    /// 단계의 몫입니다.
    pub fn parse_line(&self, line: &str) -> Option<LogEvent> {
        let captures = self.regex.captures(line)?;

        let get = |name: &str| {
            captures
                .name(name)
                .map(|m| m.as_str().to_owned())
                .unwrap_or_default()
        };

        let mut event = LogEvent::default();
        event.time = get("time");
        event.meta = get("meta");
        event.host = get("host");
        event.sourcetype = get("sourcetype");
        event.source = get("source");
        event.index = get("index");
        event.event = get("event");
        Some(event)
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}
