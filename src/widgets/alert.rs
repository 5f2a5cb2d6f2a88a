use hypertext::prelude::*;

/// Bootstrap alert contextual classes used by this app.
#[derive(Clone, Copy)]
enum Tone {
    Danger,
    Success,
}

fn render_alert(
    tone: Tone,
    msg: &str,
    buffer: &mut hypertext::Buffer<hypertext::context::Node>,
) {
    match tone {
        Tone::Danger => maud! {
            div class="alert alert-danger" role="alert" { (msg) }
        }
        .render_to(buffer),
        Tone::Success => maud! {
            div class="alert alert-success alert-dismissible" role="status" {
                (msg)
                button type="button" class="btn-close" data-bs-dismiss="alert" aria-label="Close" {}
            }
        }
        .render_to(buffer),
    }
}

/// A form-level or page-level error.
pub struct ErrorAlert<S> {
    pub msg: S,
}

impl<S: ToString> Renderable for ErrorAlert<S> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        render_alert(Tone::Danger, &self.msg.to_string(), buffer);
    }
}

pub struct SuccessAlert<S> {
    pub msg: S,
}

impl<S: ToString> Renderable for SuccessAlert<S> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        render_alert(Tone::Success, &self.msg.to_string(), buffer);
    }
}
