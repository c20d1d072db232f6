use crate::error::{AppError, AuthError};
use crate::matching::TitleMatcher;
use crate::models::Event;
use crate::prompt::{Confirmation, DeletePolicy, Prompter};
use crate::service::{CalendarService, EventQuery};
use crate::session::{LoginRequest, Session};
use chrono::{Duration, NaiveDate};
use std::sync::Arc;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parses `start`, `start,end` or `,end` into a query over event start
/// times. `end` is exclusive.
pub fn date_range_query(date: Option<&str>, text: Option<&str>) -> Result<EventQuery, AppError> {
    let mut query = EventQuery {
        text: text.filter(|t| !t.is_empty()).map(str::to_owned),
        ..EventQuery::default()
    };

    let Some(date) = date else {
        return Ok(query);
    };

    let (start, end) = date.split_once(',').unwrap_or((date, ""));

    if !start.trim().is_empty() {
        query.start_min = Some(parse_date(start)?);
    }

    if !end.trim().is_empty() {
        query.start_max = Some(parse_date(end)?);
    }

    Ok(query)
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| AppError::InvalidDate(value.to_owned(), "YYYY-MM-DD"))
}

/// `today,tomorrow` for the given day.
pub fn today_range(today: NaiveDate) -> String {
    let tomorrow = today + Duration::days(1);

    format!("{},{}", today.format(DATE_FORMAT), tomorrow.format(DATE_FORMAT))
}

/// Renders the fields named in `style` joined by `delimiter`.
pub fn entry_to_string<S>(event: &Event, style: &[S], delimiter: &str) -> String
where
    S: AsRef<str>,
{
    let fields: Vec<String> = style
        .iter()
        .map(|field| {
            let value = match field.as_ref().trim() {
                "title" => Some(event.title.clone()),
                "id" => Some(event.id.clone()),
                "url" => Some(event.url.clone()).filter(|u| !u.is_empty()),
                "content" => event.content.clone(),
                "where" => event.location.clone(),
                "start" => event.start.map(|s| s.format(EVENT_TIME_FORMAT).to_string()),
                "end" => event.end.map(|e| e.format(EVENT_TIME_FORMAT).to_string()),
                other => {
                    log::warn!("Unknown list style field: {}", other);
                    None
                }
            };

            value.unwrap_or_else(|| String::from("N/A"))
        })
        .collect();

    fields.join(delimiter)
}

pub struct CalendarClient {
    service: Arc<dyn CalendarService>,
    prompter: Box<dyn Prompter>,
    prompt_for_delete: bool,
    use_regex: bool,
    session: Session,
}

impl CalendarClient {
    pub fn new(service: Arc<dyn CalendarService>, prompter: Box<dyn Prompter>, prompt_for_delete: bool) -> Self {
        Self {
            service,
            prompter,
            prompt_for_delete,
            use_regex: false,
            session: Session::default(),
        }
    }

    /// Match event titles as regular expressions anchored at the start.
    pub fn with_regex(mut self, use_regex: bool) -> Self {
        self.use_regex = use_regex;
        self
    }

    pub async fn login(&mut self, request: &LoginRequest) -> Result<(), AuthError> {
        self.session.login(self.service.as_ref(), request).await
    }

    pub fn account(&self) -> Option<&str> {
        self.session.email()
    }

    pub async fn quick_add_event(&self, text: &str) -> Result<Event, AppError> {
        self.session.require()?;

        let event = self.service.quick_add_event(text).await?;
        log::info!("Added event '{}' ({})", event.title, event.id);

        Ok(event)
    }

    /// Events matching the date range, full-text query and title.
    pub async fn get_events(&self, date: Option<&str>, title: Option<&str>, query: Option<&str>) -> Result<Vec<Event>, AppError> {
        self.session.require()?;

        let matcher = title
            .map(|title| TitleMatcher::new(title, self.use_regex))
            .transpose()?;
        let query = date_range_query(date, query)?;
        log::debug!("Listing events with {:?}", query);

        let events = self.service.list_events(&query).await?;

        Ok(match matcher {
            Some(matcher) => events.into_iter().filter(|e| matcher.matches(&e.title)).collect(),
            None => events,
        })
    }

    pub async fn delete_events(&mut self, events: Vec<Event>, delete_default: bool) -> Result<Vec<(Event, Confirmation)>, AppError> {
        self.session.require()?;

        if events.is_empty() {
            println!("No events found to delete");
        }

        let policy = DeletePolicy {
            prompt: self.prompt_for_delete,
            default_confirm: delete_default,
        };
        let mut decisions = Vec::with_capacity(events.len());

        for event in events {
            let question = format!("Are you SURE you want to delete event {}?", event.title);
            let decision = Confirmation::Pending.decide(policy, &question, self.prompter.as_mut());

            if decision == Confirmation::Confirmed {
                self.service.delete_event(&event.id).await?;
                log::info!("Deleted event '{}' ({})", event.title, event.id);
            }

            decisions.push((event, decision));
        }

        Ok(decisions)
    }
}
