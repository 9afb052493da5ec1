// SPDX-License-Identifier: MIT

//! Coach delegation: training plans, workout analysis and progress
//! reports generated by an OpenAI-compatible chat-completion endpoint.
//!
//! Conversation context is a persisted per-user session row, loaded and
//! saved around every call. Nothing is held in process memory, so
//! conversations survive restarts and never leak between users.

use crate::db::Db;
use crate::error::AppError;
use crate::models::{User, Workout};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Completions can be slow; this is deliberately more lenient than the
/// Strava timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// System prompt seeding every new conversation session.
const SYSTEM_PROMPT: &str = "You are an expert personal running coach. \
You have access to the athlete's profile (biometrics and goals) and \
their recent training history. Use that context to personalize your \
recommendations, analyses and training plans, and keep continuity with \
earlier turns of the conversation.";

/// One turn in a coach conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request body (OpenAI wire shape).
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

/// Low-level chat-completion client.
#[derive(Clone)]
pub struct CoachClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl CoachClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    /// Run one completion over the full message history and return the
    /// assistant's reply.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut request = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
            });

        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::CoachApi(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::CoachApi(format!("HTTP {status}: {body}")));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::CoachApi(format!("JSON parse error: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::CoachApi("No completion choices returned".to_string()))
    }
}

/// High-level coach service with session persistence.
#[derive(Clone)]
pub struct CoachService {
    client: CoachClient,
    db: Db,
}

impl CoachService {
    pub fn new(client: CoachClient, db: Db) -> Self {
        Self { client, db }
    }

    /// Generate a training plan for a goal, in the user's conversation
    /// context.
    pub async fn create_training_plan(&self, user: &User, goal: &str) -> Result<String, AppError> {
        let prompt = format!(
            "I need a weekly training plan.\n\n\
             Goal: {goal}\n\n\
             My profile: {name}, {age} years old, {weight:.1} kg, {height:.0} cm, \
             fitness level {level}.\n\n\
             Design a 7-day microcycle adapted to my level and recent load. \
             For each day give the session type (easy run, intervals, tempo, \
             long run, drills or rest), distance or duration, target paces or \
             heart-rate zones, and the goal of the session. Keep it clear and \
             actionable.",
            goal = goal,
            name = user.name,
            age = user.age,
            weight = user.weight_kg,
            height = user.height_cm,
            level = user.fitness_level,
        );

        self.converse(user.id, &prompt).await
    }

    /// Weekly plan request, or a follow-up question in the ongoing
    /// conversation.
    pub async fn weekly_plan(
        &self,
        user_id: i64,
        question: Option<&str>,
    ) -> Result<String, AppError> {
        let prompt = match question {
            Some(q) => q.to_string(),
            None => "I need this week's training plan. Consider my profile, my \
                     recent workouts and the context of our previous \
                     conversations, then design a 7-day microcycle. For each \
                     day give the session type, distance or duration, target \
                     paces or heart-rate zones, and the session's goal."
                .to_string(),
        };

        self.converse(user_id, &prompt).await
    }

    /// Analyze a single workout.
    pub async fn analyze_workout(
        &self,
        user_id: i64,
        workout: &Workout,
    ) -> Result<String, AppError> {
        let prompt = format_workout_prompt(workout);
        self.converse(user_id, &prompt).await
    }

    /// Generate a progress report over a period of workouts.
    pub async fn progress_report(
        &self,
        user_id: i64,
        period: &str,
        workouts: &[Workout],
    ) -> Result<String, AppError> {
        let mut summary = String::new();
        for w in workouts {
            summary.push_str(&format!(
                "\n- {}: {}, {:.2} km, {} min, pace {}, HR {} bpm",
                w.date, w.workout_type, w.distance_km, w.duration_min, w.avg_pace, w.avg_heart_rate
            ));
        }

        let prompt = format!(
            "I need a progress report.\n\n\
             Period analyzed: {period}\n\n\
             Workouts in the period:{summary}\n\n\
             Compare these weeks against my earlier training, evaluate volume, \
             intensity, pace and heart-rate trends, and signs of improvement \
             or fatigue. Propose volume and intensity adjustments for the next \
             two weeks and name two or three key focus areas. Structure the \
             report in clear sections."
        );

        self.converse(user_id, &prompt).await
    }

    /// Core conversation step: load the persisted session, append the
    /// user turn, complete, append the reply, save.
    pub async fn converse(&self, user_id: i64, prompt: &str) -> Result<String, AppError> {
        let mut messages = self.load_session(user_id).await?;
        messages.push(ChatMessage::user(prompt));

        let reply = self.client.complete(&messages).await?;

        messages.push(ChatMessage::assistant(reply.clone()));
        let json = serde_json::to_string(&messages).map_err(|e| AppError::Internal(e.into()))?;
        self.db.upsert_chat_session(user_id, &json).await?;

        Ok(reply)
    }

    /// Load the user's session, seeding a fresh one (system prompt only)
    /// when absent or unreadable.
    async fn load_session(&self, user_id: i64) -> Result<Vec<ChatMessage>, AppError> {
        if let Some(session) = self.db.get_chat_session(user_id).await? {
            match serde_json::from_str::<Vec<ChatMessage>>(&session.messages) {
                Ok(messages) if !messages.is_empty() => return Ok(messages),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Unreadable chat session, reseeding");
                }
            }
        }

        Ok(vec![ChatMessage::system(SYSTEM_PROMPT)])
    }
}

/// Format a workout into the analysis prompt.
fn format_workout_prompt(workout: &Workout) -> String {
    format!(
        "Analyze this training session:\n\n\
         Date: {date}\n\
         Type: {workout_type}\n\
         Distance: {distance:.2} km\n\
         Duration: {duration} minutes\n\
         Avg pace: {pace}\n\
         Avg heart rate: {hr} bpm\n\
         Avg power: {power} W\n\
         Cadence: {cadence} spm\n\
         Elevation gain: {elevation} m\n\
         Feeling: {feeling}\n\
         Notes: {notes}\n\n\
         Evaluate whether this session fits my goal and recent load, flag \
         fatigue or overload risks, and give concrete recommendations for \
         the next 24-48 hours. Be specific and actionable.",
        date = workout.date,
        workout_type = workout.workout_type,
        distance = workout.distance_km,
        duration = workout.duration_min,
        pace = workout.avg_pace,
        hr = workout.avg_heart_rate,
        power = workout.avg_power,
        cadence = workout.cadence,
        elevation = workout.elevation_gain,
        feeling = workout.feeling,
        notes = workout.notes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_roundtrip() {
        let messages = vec![
            ChatMessage::system("be helpful"),
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi there"),
        ];

        let json = serde_json::to_string(&messages).unwrap();
        let decoded: Vec<ChatMessage> = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0].role, "system");
        assert_eq!(decoded[2].content, "hi there");
    }

    #[test]
    fn test_workout_prompt_includes_metrics() {
        let workout = Workout {
            id: 1,
            user_id: 1,
            date: "2024-05-01T08:00:00Z".to_string(),
            workout_type: "tempo".to_string(),
            distance_km: 12.5,
            duration_min: 58,
            avg_pace: "4:38".to_string(),
            avg_heart_rate: 162,
            avg_power: 295,
            cadence: 176,
            elevation_gain: 40,
            calories: 700,
            notes: "Felt strong".to_string(),
            feeling: "good".to_string(),
            strava_activity_id: None,
            strava_data: None,
            created_at: "2024-05-01T10:00:00Z".to_string(),
        };

        let prompt = format_workout_prompt(&workout);

        assert!(prompt.contains("12.50 km"));
        assert!(prompt.contains("4:38"));
        assert!(prompt.contains("162 bpm"));
        assert!(prompt.contains("tempo"));
    }
}
