use crossterm::event::{KeyCode, KeyEvent};

use crate::errors::ValidationError;
use crate::models::{CreateTestRequest, Video};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    VariantA,
    VariantB,
}

#[derive(Debug, PartialEq, Eq)]
pub enum FormAction {
    None,
    Submit(CreateTestRequest),
    Cancel,
}

/// Modal for creating a test against one video.
#[derive(Debug, Clone)]
pub struct TestForm {
    pub video: Video,
    pub variant_a: String,
    pub variant_b: String,
    pub focus: FormField,
    pub error: Option<String>,
    pub submitting: bool,
}

impl TestForm {
    pub fn new(video: Video) -> Self {
        Self {
            variant_a: video.title.clone(),
            variant_b: String::new(),
            video,
            focus: FormField::VariantB,
            error: None,
            submitting: false,
        }
    }

    pub fn validate(&self) -> Result<CreateTestRequest, ValidationError> {
        if self.variant_b.trim().is_empty() {
            return Err(ValidationError::MissingVariantB);
        }

        Ok(CreateTestRequest {
            video_id: self.video.id.clone(),
            video_title: self.video.title.clone(),
            original_thumbnail: self.video.thumbnail_url.clone(),
            variant_a: self.variant_a.trim().to_string(),
            variant_b: self.variant_b.trim().to_string(),
        })
    }

    /// Validates and, when valid, marks the form as in flight. A second
    /// submit while one is in flight is ignored.
    pub fn submit(&mut self) -> FormAction {
        if self.submitting {
            return FormAction::None;
        }

        match self.validate() {
            Ok(payload) => {
                self.error = None;
                self.submitting = true;
                FormAction::Submit(payload)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                FormAction::None
            }
        }
    }

    pub fn fail(&mut self, message: String) {
        self.submitting = false;
        self.error = Some(message);
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> FormAction {
        match key.code {
            KeyCode::Esc => FormAction::Cancel,
            KeyCode::Enter => self.submit(),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.focus = match self.focus {
                    FormField::VariantA => FormField::VariantB,
                    FormField::VariantB => FormField::VariantA,
                };
                FormAction::None
            }
            KeyCode::Backspace => {
                if !self.submitting {
                    self.focused_mut().pop();
                }
                FormAction::None
            }
            KeyCode::Char(c) => {
                if !self.submitting {
                    self.focused_mut().push(c);
                    self.error = None;
                }
                FormAction::None
            }
            _ => FormAction::None,
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::VariantA => &mut self.variant_a,
            FormField::VariantB => &mut self.variant_b,
        }
    }
}
