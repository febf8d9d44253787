//! Fixed pivot-language messages.

pub const WELCOME_MESSAGE: &str = "Hello! I'm your Campus Assistant. I can help you with:\n\n\
• Admission queries\n\
• Fee and scholarship information\n\
• Examination schedules and results\n\
• Timetables and academic calendar\n\
• Hostel and campus facilities\n\
• Contact information\n\n\
How can I assist you today?";

/// Sent when the generation provider fails after retries.
pub const APOLOGY_MESSAGE: &str = "I apologize, but I'm having trouble processing your request. \
Please try again, or contact the administrative office for assistance.";

/// Sent when a provider is rate limiting the assistant.
pub const UNAVAILABLE_MESSAGE: &str = "The assistant is temporarily unavailable because of high demand. \
Your question has been passed to the college office, and you can also try again in a few minutes.";

/// Starter questions offered with the welcome message.
pub const STARTER_QUESTIONS: &[&str] = &[
    "What is the fee structure?",
    "What documents are required for admission?",
    "When will the results be announced?",
    "What facilities are available in the hostel?",
    "How can I contact the office?",
];
