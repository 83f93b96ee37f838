//! Prompts sent with every analysis request.
//!
//! The report formatter only recognises a handful of conventions (section
//! headings, `- key: value` bullets, pipe tables), so the system prompt asks
//! for exactly those. Callers can override either text via
//! [`crate::config::AnalyzerConfig`].

/// Default system prompt for medical report analysis.
pub const SYSTEM_PROMPT: &str = "You are an expert medical report analyzer. \
You will receive medical report images and provide detailed analysis including key findings, \
measurements, and recommendations.
Format your response using markdown syntax for better readability.
Use appropriate formatting like bold for important values, tables for test results, and proper headings.
If the image is not a medical report, kindly inform that the image appears to be something else.";

/// Default text that accompanies the image in the user message.
pub const USER_INSTRUCTION: &str = "Please analyze this medical report image and provide a \
detailed summary. If this is not a medical report, please let me know.";
