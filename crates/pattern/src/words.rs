// Rust guideline compliant 2026-07-20

//! Built-in word pool for `<text/...>` value generation.

/// Common-English word pool used when a `<text>` token names no word file.
///
/// 350 entries -- index always derived from `random_range(0..WORDS.len())`,
/// never panics.
pub const WORDS: &[&str] = &[
    "the", "be", "to", "of", "and", "a", "in", "that", "have", "it",
    "for", "not", "on", "with", "he", "as", "you", "do", "at", "this",
    "but", "his", "by", "from", "they", "we", "say", "her", "she", "or",
    "an", "will", "my", "one", "all", "would", "there", "their", "what", "so",
    "up", "out", "if", "about", "who", "get", "which", "go", "me", "when",
    "make", "can", "like", "time", "no", "just", "him", "know", "take", "people",
    "into", "year", "your", "good", "some", "could", "them", "see", "other", "than",
    "then", "now", "look", "only", "come", "its", "over", "think", "also", "back",
    "after", "use", "two", "how", "our", "work", "first", "well", "way", "even",
    "new", "want", "because", "any", "these", "give", "day", "most", "us", "is",
    "was", "are", "been", "has", "had", "were", "said", "did", "having", "may",
    "world", "life", "hand", "part", "child", "eye", "woman", "place", "week", "case",
    "point", "government", "company", "number", "group", "problem", "fact", "money", "lot", "right",
    "study", "book", "job", "word", "business", "issue", "side", "kind", "head", "house",
    "service", "friend", "father", "power", "hour", "game", "line", "end", "member", "law",
    "car", "city", "community", "name", "president", "team", "minute", "idea", "kid", "body",
    "information", "parent", "face", "others", "level", "office", "door", "health", "person", "art",
    "war", "history", "party", "result", "change", "morning", "reason", "research", "girl", "guy",
    "moment", "air", "teacher", "force", "education", "foot", "boy", "age", "policy", "process",
    "music", "market", "sense", "nation", "plan", "college", "interest", "death", "experience", "effect",
    "long", "little", "own", "old", "big", "high", "different", "small", "large", "next",
    "early", "young", "important", "few", "public", "bad", "same", "able", "human", "local",
    "late", "hard", "major", "better", "economic", "strong", "possible", "whole", "free", "military",
    "true", "federal", "international", "full", "special", "easy", "clear", "recent", "certain", "personal",
    "open", "red", "difficult", "available", "likely", "short", "single", "medical", "current", "wrong",
    "private", "past", "foreign", "fine", "common", "poor", "natural", "significant", "similar", "hot",
    "dead", "central", "happy", "serious", "ready", "simple", "left", "physical", "general", "environmental",
    "financial", "blue", "democratic", "dark", "various", "entire", "close", "legal", "religious", "cold",
    "final", "main", "green", "nice", "huge", "popular", "traditional", "cultural", "school", "student",
    "country", "state", "family", "home", "room", "mother", "area", "story", "month", "night",
    "water", "thing", "man", "find", "tell", "ask", "seem", "feel", "try", "leave",
    "call", "last", "great", "mean", "keep", "let", "begin", "help", "talk", "turn",
    "start", "show", "hear", "play", "run", "move", "live", "believe", "hold", "bring",
    "happen", "write", "provide", "sit", "stand", "lose", "pay", "meet", "include", "continue",
    "set", "learn", "lead", "understand", "watch", "follow", "stop", "create", "speak", "read",
];
