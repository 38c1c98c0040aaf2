use folio::contexts::AnswerSource;
use std::time::Instant;

/// Tallies how a chat session's answers were produced
pub struct SessionTally {
    structured: usize,
    fallback: usize,
    canned: usize,
    start_time: Instant,
}

impl SessionTally {
    pub fn new() -> Self {
        Self {
            structured: 0,
            fallback: 0,
            canned: 0,
            start_time: Instant::now(),
        }
    }

    pub fn record(&mut self, source: AnswerSource) {
        match source {
            AnswerSource::Structured => self.structured += 1,
            AnswerSource::Fallback => self.fallback += 1,
            AnswerSource::Canned => self.canned += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.structured + self.fallback + self.canned
    }

    pub fn finish(&self) {
        if self.total() == 0 {
            return;
        }
        let elapsed = self.start_time.elapsed();
        println!("\n{}", "=".repeat(60));
        println!("Summary:");
        println!("  Questions:  {}", self.total());
        println!("  Structured: {}", self.structured);
        println!("  Fallback:   {}", self.fallback);
        println!("  Canned:     {}", self.canned);
        println!("  Duration:   {:.2}s", elapsed.as_secs_f64());
        println!("{}", "=".repeat(60));
    }
}
