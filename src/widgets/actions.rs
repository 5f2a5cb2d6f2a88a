use hypertext::prelude::*;

/// A row of links shown as buttons above a listing. The first link is the
/// main action.
pub struct Actions<'r> {
    pub options: &'r [(&'r str, &'r str)],
}

impl<'r> Renderable for Actions<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            div class="d-flex flex-wrap gap-2 my-3" {
                @for (i, (href, text)) in self.options.iter().enumerate() {
                    @if i == 0 {
                        a class="btn btn-primary" href=(href) { (text) }
                    } @else {
                        a class="btn btn-outline-secondary" href=(href) { (text) }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}
