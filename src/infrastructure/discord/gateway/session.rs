/// Resume bookkeeping for one logical session.
///
/// Written only from the frame-handling path. `session_id` and
/// `resume_gateway_url` are set together by `READY`; the sequence only moves
/// forward and is reset when a fresh Identify is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    session_id: Option<String>,
    resume_gateway_url: Option<String>,
    sequence: Option<u64>,
}

impl SessionState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session_id: None,
            resume_gateway_url: None,
            sequence: None,
        }
    }

    pub fn set_session(&mut self, session_id: String, resume_url: String) {
        self.session_id = Some(session_id);
        self.resume_gateway_url = Some(resume_url);
    }

    /// Records a dispatch sequence. Older or repeated numbers are ignored.
    pub fn update_sequence(&mut self, sequence: Option<u64>) {
        if let Some(seq) = sequence
            && self.sequence.is_none_or(|current| seq > current)
        {
            self.sequence = Some(seq);
        }
    }

    /// Forgets the sequence; done right before a fresh Identify.
    pub const fn reset_sequence(&mut self) {
        self.sequence = None;
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    #[must_use]
    pub fn resume_gateway_url(&self) -> Option<&str> {
        self.resume_gateway_url.as_deref()
    }

    #[must_use]
    pub const fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    #[must_use]
    pub const fn can_resume(&self) -> bool {
        self.session_id.is_some()
    }

    pub fn clear(&mut self) {
        self.session_id = None;
        self.resume_gateway_url = None;
        self.sequence = None;
    }
}
