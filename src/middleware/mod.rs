/*
 * Responsibility
 * - HTTP interception pipeline, outermost first:
 *   error_mapper -> http (limits/timeout/cors/panic) -> logging -> auth -> handlers
 * - Requests flow top-down; responses (or mapped failures) unwind in reverse
 */
pub mod auth;
pub mod capture;
pub mod error_mapper;
pub mod filter;
pub mod http;
pub mod logging;
