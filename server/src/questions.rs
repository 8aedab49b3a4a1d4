//! Question provider for the level ladder
//!
//! The coordinator only needs "a random question for level N" and the prize
//! attached to each level. [`QuestionBank`] is the stock implementation: it is
//! built from the bundled trivia pool, from a pipe-delimited text file, or
//! from an explicit list of questions.

use log::{debug, info};
use rand::seq::SliceRandom;
use shared::{ServerMessage, CHOICES_PER_QUESTION, MAX_LEVEL};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Prize banked for answering the question of each level (index 0 = level 1)
pub const PRIZE_LADDER: [u64; MAX_LEVEL as usize] = [
    1_000, 5_000, 10_000, 30_000, 50_000, 100_000, 300_000, 500_000, 1_000_000, 1_500_000,
    2_000_000, 3_000_000, 5_000_000, 10_000_000, 20_000_000,
];

pub fn ladder_prize(level: u8) -> Option<u64> {
    if level == 0 {
        return None;
    }
    PRIZE_LADDER.get(level as usize - 1).copied()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub level: u8,
    pub prompt: String,
    pub choices: [String; CHOICES_PER_QUESTION],
    pub correct: u8,
    pub prize: u64,
}

impl Question {
    pub fn new(level: u8, prompt: &str, choices: [&str; CHOICES_PER_QUESTION], correct: u8) -> Self {
        Self {
            level,
            prompt: prompt.to_string(),
            choices: choices.map(str::to_string),
            correct,
            prize: ladder_prize(level).unwrap_or(0),
        }
    }

    pub fn is_correct(&self, choice: u8) -> bool {
        choice == self.correct
    }

    /// Client-facing form of the question, without the answer
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Question {
            prompt: self.prompt.clone(),
            choices: self.choices.clone(),
            level: self.level,
            prize: self.prize,
        }
    }
}

/// Source of questions for the coordinator
pub trait QuestionProvider: Send + Sync {
    /// Returns a randomly chosen question for `level`, if the level exists
    fn question_for_level(&self, level: u8) -> Option<Question>;

    fn prize_for_level(&self, level: u8) -> Option<u64>;
}

#[derive(Debug, Error)]
pub enum QuestionBankError {
    #[error("failed to read question file: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("no question available for level {0}")]
    MissingLevel(u8),
    #[error("question for level {level} has invalid correct choice {correct}")]
    InvalidQuestion { level: u8, correct: u8 },
}

/// Questions grouped by level, one bucket per rung of the ladder
#[derive(Debug, Clone)]
pub struct QuestionBank {
    levels: Vec<Vec<Question>>,
}

impl QuestionBank {
    /// Builds a bank from an explicit list. Every level 1..=15 must be covered.
    pub fn from_questions(questions: Vec<Question>) -> Result<Self, QuestionBankError> {
        let mut levels: Vec<Vec<Question>> = vec![Vec::new(); MAX_LEVEL as usize];

        for question in questions {
            if question.level == 0 || question.level > MAX_LEVEL {
                return Err(QuestionBankError::MissingLevel(question.level));
            }
            if question.correct as usize >= CHOICES_PER_QUESTION {
                return Err(QuestionBankError::InvalidQuestion {
                    level: question.level,
                    correct: question.correct,
                });
            }
            levels[question.level as usize - 1].push(question);
        }

        if let Some(empty) = levels.iter().position(Vec::is_empty) {
            return Err(QuestionBankError::MissingLevel(empty as u8 + 1));
        }

        Ok(Self { levels })
    }

    /// Loads a bank from a text file with one question per line:
    ///
    /// `level|prompt|choice1|choice2|choice3|choice4|correct_index`
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, QuestionBankError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let bank = Self::parse(&contents)?;
        info!(
            "Loaded {} questions from {}",
            bank.len(),
            path.as_ref().display()
        );
        Ok(bank)
    }

    pub fn parse(contents: &str) -> Result<Self, QuestionBankError> {
        let mut questions = Vec::new();

        for (index, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            questions.push(parse_line(index + 1, line)?);
        }

        Self::from_questions(questions)
    }

    pub fn len(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The bundled IT trivia pool
    pub fn builtin() -> Self {
        let questions = vec![
            Question::new(1, "What does the acronym HTML stand for?",
                ["HyperText Markup Language", "High Tech Modern Language", "Home Tool Markup Language", "Hyperlink Text Markup Language"], 0),
            Question::new(1, "Which language runs natively in every web browser?",
                ["Python", "JavaScript", "Java", "C++"], 1),
            Question::new(1, "What is a 'bug' in programming?",
                ["A new feature", "A variable type", "An error in the code", "A testing method"], 2),
            Question::new(2, "What does HTTP stand for?",
                ["HyperText Transfer Protocol", "High Tech Transfer Protocol", "Home Tool Transfer Protocol", "Hyperlink Text Transfer Protocol"], 0),
            Question::new(2, "Which data structure is Last In, First Out?",
                ["Queue", "List", "Tree", "Stack"], 3),
            Question::new(3, "What is CSS used for?",
                ["Styling web pages", "Querying databases", "Compiling code", "Sending email"], 0),
            Question::new(3, "Which protocol is the standard for sending email?",
                ["HTTP", "FTP", "SMTP", "TCP"], 2),
            Question::new(4, "What does SQL stand for?",
                ["Simple Query Language", "Structured Query Language", "Standard Query Language", "System Query Language"], 1),
            Question::new(4, "What is the worst-case time complexity of QuickSort?",
                ["O(n log n)", "O(n)", "O(log n)", "O(n^2)"], 3),
            Question::new(5, "Which port does HTTPS use by default?",
                ["443", "80", "21", "8080"], 0),
            Question::new(5, "What does DNS translate domain names into?",
                ["MAC addresses", "IP addresses", "Port numbers", "File paths"], 1),
            Question::new(6, "Which OSI layer is responsible for routing?",
                ["Transport", "Data link", "Network", "Session"], 2),
            Question::new(6, "What does ACID stand for in databases?",
                ["Atomicity, Consistency, Isolation, Durability", "Access, Control, Integrity, Data", "Atomicity, Concurrency, Integrity, Distribution", "Availability, Consistency, Isolation, Durability"], 0),
            Question::new(7, "Which sorting algorithm is stable and runs in O(n log n) worst case?",
                ["QuickSort", "HeapSort", "Selection sort", "Merge sort"], 3),
            Question::new(7, "What is a race condition?",
                ["A benchmark between CPUs", "Behaviour that depends on the timing of concurrent operations", "A deadlock between two threads", "A compiler optimisation"], 1),
            Question::new(8, "What does the CAP theorem trade off?",
                ["Consistency, Availability, Partition tolerance", "Cost, Accuracy, Performance", "Caching, Authentication, Persistence", "Concurrency, Atomicity, Partitioning"], 0),
            Question::new(8, "Which transport protocol guarantees ordered delivery?",
                ["UDP", "ICMP", "TCP", "ARP"], 2),
            Question::new(9, "Which algorithm finds shortest paths with non-negative edge weights?",
                ["Kruskal", "Dijkstra", "Prim", "Floyd-Fulkerson"], 1),
            Question::new(9, "What is the purpose of a salt in password hashing?",
                ["Speed up hashing", "Compress the hash", "Encrypt the password", "Defeat precomputed rainbow tables"], 3),
            Question::new(10, "What does a three-way handshake establish?",
                ["A TCP connection", "A TLS certificate", "A DNS lookup", "A UDP session"], 0),
            Question::new(10, "Which consensus algorithm uses leader election and replicated logs?",
                ["Paxos Lite", "Gossip", "Raft", "Bully-free"], 2),
            Question::new(11, "What problem does a Bloom filter never produce?",
                ["False positives", "False negatives", "Hash collisions", "Memory overhead"], 1),
            Question::new(11, "What is the time complexity of lookup in a balanced binary search tree?",
                ["O(log n)", "O(1)", "O(n)", "O(n log n)"], 0),
            Question::new(12, "Which property makes a hash function suitable for cryptography?",
                ["Reversibility", "Linear output", "Short output", "Collision resistance"], 3),
            Question::new(12, "What does TLB stand for in CPU architecture?",
                ["Thread Lock Buffer", "Translation Lookaside Buffer", "Transfer Line Bus", "Table Load Balancer"], 1),
            Question::new(13, "Which scheduling problem can cause a high-priority task to wait on a low-priority one?",
                ["Starvation", "Thrashing", "Priority inversion", "Convoy effect"], 2),
            Question::new(13, "What does the halting problem prove?",
                ["No general algorithm decides if any program halts", "Every program eventually halts", "Halting is decidable for Turing machines", "Loops are undecidable only in C"], 0),
            Question::new(14, "Which complexity class contains problems verifiable in polynomial time?",
                ["P", "EXP", "PSPACE", "NP"], 3),
            Question::new(14, "In Lamport clocks, what is guaranteed if event a happens before b?",
                ["C(a) > C(b)", "C(a) < C(b)", "C(a) = C(b)", "Nothing at all"], 1),
            Question::new(15, "Which result shows consensus is impossible in a fully asynchronous system with one faulty process?",
                ["FLP impossibility", "CAP theorem", "Byzantine generals", "Two generals"], 0),
            Question::new(15, "What does a linearizable object guarantee?",
                ["Operations never conflict", "Eventual convergence only", "Each operation appears to take effect atomically between its invocation and response", "Reads never block"], 2),
        ];

        let mut levels: Vec<Vec<Question>> = vec![Vec::new(); MAX_LEVEL as usize];
        for question in questions {
            levels[question.level as usize - 1].push(question);
        }
        Self { levels }
    }
}

fn parse_line(line: usize, text: &str) -> Result<Question, QuestionBankError> {
    let parse_error = |reason: String| QuestionBankError::Parse { line, reason };

    let parts: Vec<&str> = text.split('|').map(str::trim).collect();
    if parts.len() != 3 + CHOICES_PER_QUESTION {
        return Err(parse_error(format!(
            "expected {} fields, found {}",
            3 + CHOICES_PER_QUESTION,
            parts.len()
        )));
    }

    let level: u8 = parts[0]
        .parse()
        .map_err(|_| parse_error(format!("invalid level '{}'", parts[0])))?;
    if level == 0 || level > MAX_LEVEL {
        return Err(parse_error(format!("level {} outside 1..={}", level, MAX_LEVEL)));
    }

    let correct_field = parts[2 + CHOICES_PER_QUESTION];
    let correct: u8 = correct_field
        .parse()
        .map_err(|_| parse_error(format!("invalid correct index '{}'", correct_field)))?;
    if correct as usize >= CHOICES_PER_QUESTION {
        return Err(parse_error(format!("correct index {} outside 0..=3", correct)));
    }

    if parts[1].is_empty() {
        return Err(parse_error("empty prompt".to_string()));
    }

    Ok(Question::new(
        level,
        parts[1],
        [parts[2], parts[3], parts[4], parts[5]],
        correct,
    ))
}

impl QuestionProvider for QuestionBank {
    fn question_for_level(&self, level: u8) -> Option<Question> {
        if level == 0 {
            return None;
        }
        let bucket = self.levels.get(level as usize - 1)?;
        let question = bucket.choose(&mut rand::thread_rng()).cloned();
        debug!("Drew question for level {} from {} candidates", level, bucket.len());
        question
    }

    fn prize_for_level(&self, level: u8) -> Option<u64> {
        ladder_prize(level)
    }
}
