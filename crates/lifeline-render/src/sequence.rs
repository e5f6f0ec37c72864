use crate::bounds::Bounds;
use crate::model::{
    LayoutActivation, LayoutActor, LayoutBlock, LayoutMessage, LayoutNote, LayoutSection,
    SequenceDiagramLayout,
};
use crate::text::{TextMeasurer, TextMetrics, TextStyle};
use crate::{Error, Result};
use lifeline_core::config::{FontWeight, LiveConfig, SequenceConfig};
use lifeline_core::diagrams::sequence::{
    ActivationEdge, BlockKind, BlockMarker, DiagramState, Event, Message, Note, NotePlacement,
};
use rustc_hash::FxHashMap;

/// Extra height a titled diagram reserves above the actors.
const TITLE_HEIGHT: f64 = 40.0;
/// Self-messages loop out at least this far on each side of the lifeline.
const SELF_MESSAGE_MIN_HALF_WIDTH: f64 = 100.0;
const SELF_MESSAGE_EXTRA_BUMP: f64 = 30.0;
/// Activation boxes shorter than this are stretched.
const MIN_ACTIVATION_HEIGHT: f64 = 18.0;

#[derive(Debug, Clone, Copy)]
struct ActorGeom {
    x: f64,
    width: f64,
}

impl ActorGeom {
    fn center(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenActivation {
    start_x: f64,
    start_y: f64,
    stop_x: f64,
}

struct OpenBlock {
    kind: BlockKind,
    label: String,
    section_labels: Vec<String>,
}

struct SequenceLayout<'a> {
    conf: &'a SequenceConfig,
    measurer: &'a dyn TextMeasurer,
    actor_style: TextStyle,
    message_style: TextStyle,
    note_style: TextStyle,
    bounds: Bounds,
    geoms: FxHashMap<&'a str, ActorGeom>,
    activations: FxHashMap<&'a str, Vec<OpenActivation>>,
    open_blocks: Vec<OpenBlock>,
    out: SequenceDiagramLayout,
}

/// Replays `state`'s events against a [`Bounds`] and returns the computed geometry.
pub fn layout_sequence_diagram(
    state: &DiagramState,
    config: &LiveConfig,
    measurer: &dyn TextMeasurer,
) -> Result<SequenceDiagramLayout> {
    let conf = &config.sequence;
    let mut layout = SequenceLayout {
        conf,
        measurer,
        actor_style: text_style(config, conf.actor_font_size),
        message_style: text_style(config, conf.message_font_size),
        note_style: text_style(config, conf.note_font_size),
        bounds: Bounds::new(conf.box_margin),
        geoms: FxHashMap::default(),
        activations: FxHashMap::default(),
        open_blocks: Vec::new(),
        out: SequenceDiagramLayout {
            actors: Vec::new(),
            mirrored_actors: Vec::new(),
            messages: Vec::new(),
            notes: Vec::new(),
            activations: Vec::new(),
            blocks: Vec::new(),
            title: state.title().map(str::to_string),
            bounds: Default::default(),
            width: 0.0,
            height: 0.0,
        },
    };

    layout.place_actors(state);
    for event in state.events() {
        tracing::trace!(line_type = ?event.line_type(), "layout event");
        layout.event(event)?;
    }
    layout.finish()
}

fn text_style(config: &LiveConfig, font_size: f64) -> TextStyle {
    TextStyle {
        font_family: config.font_family.clone(),
        font_size,
        font_weight: config.font_weight.as_ref().map(|w| match w {
            FontWeight::Number(n) => n.to_string(),
            FontWeight::Name(s) => s.clone(),
        }),
    }
}

impl<'a> SequenceLayout<'a> {
    fn place_actors(&mut self, state: &'a DiagramState) {
        let y = self.bounds.vertical_pos();
        let mut x = 0.0;
        for (name, actor) in state.actors() {
            let width = if actor.wrap {
                self.conf.width
            } else {
                let text = self.measurer.measure(&actor.description, &self.actor_style);
                self.conf.width.max(text.width + 2.0 * self.conf.wrap_padding)
            };
            self.geoms.insert(name.as_str(), ActorGeom { x, width });
            self.bounds.insert(x, y, x + width, y + self.conf.height);
            self.out.actors.push(LayoutActor {
                name: name.clone(),
                description: actor.description.clone(),
                actor_type: actor.actor_type,
                x,
                y,
                width,
                height: self.conf.height,
            });
            x += width + self.conf.actor_margin;
        }
        self.bounds.bump_vertical_pos(self.conf.height);
    }

    fn geom(&self, actor: &str) -> Result<ActorGeom> {
        self.geoms
            .get(actor)
            .copied()
            .ok_or_else(|| Error::InvalidModel {
                message: format!("event references unknown actor `{actor}`"),
            })
    }

    /// Horizontal extent of an actor's lifeline, widened by its open activation boxes.
    fn flow_bounds(&self, actor: &str) -> Result<(f64, f64)> {
        let center = self.geom(actor)?.center();
        let open = self.activations.get(actor).map(Vec::as_slice).unwrap_or_default();
        let left = open.iter().fold(center, |acc, a| acc.min(a.start_x));
        let right = open.iter().fold(center, |acc, a| acc.max(a.stop_x));
        Ok((left, right))
    }

    fn event(&mut self, event: &'a Event) -> Result<()> {
        match event {
            Event::Message(m) => self.message(m),
            Event::Note(n) => self.note(n),
            Event::Activation {
                edge: ActivationEdge::Start,
                actor,
            } => self.activation_start(actor),
            Event::Activation {
                edge: ActivationEdge::End,
                actor,
            } => self.activation_end(actor),
            Event::Block { marker, label } => {
                self.block(*marker, label.as_deref().unwrap_or_default())
            }
        }
    }

    fn measure(&self, text: &str, style: &TextStyle, wrap: bool, max_width: f64) -> TextMetrics {
        if wrap {
            self.measurer.measure_wrapped(text, style, max_width)
        } else {
            self.measurer.measure(text, style)
        }
    }

    fn message(&mut self, m: &Message) -> Result<()> {
        self.bounds.bump_vertical_pos(self.conf.message_margin);

        let (from_left, from_right) = self.flow_bounds(&m.from)?;
        let (to_left, to_right) = self.flow_bounds(&m.to)?;
        let (start_x, stop_x) = if from_left < to_left {
            (from_right, to_left)
        } else {
            (from_left, to_right)
        };

        let span = (stop_x - start_x).abs().max(self.conf.width);
        let text = self.measure(
            &m.text,
            &self.message_style,
            m.wrap,
            span - 2.0 * self.conf.wrap_padding,
        );

        let self_message = m.from == m.to;
        if self_message {
            self.bounds.bump_vertical_pos(SELF_MESSAGE_EXTRA_BUMP);
            let y = self.bounds.vertical_pos();
            let dx = (text.width / 2.0).max(SELF_MESSAGE_MIN_HALF_WIDTH);
            self.bounds.insert(start_x - dx, y - 10.0, stop_x + dx, y);
        } else {
            let y = self.bounds.vertical_pos();
            self.bounds.insert(start_x, y - 10.0, stop_x, y);
        }

        self.out.messages.push(LayoutMessage {
            kind: m.kind,
            from: m.from.clone(),
            to: m.to.clone(),
            text: m.text.clone(),
            start_x,
            stop_x,
            y: self.bounds.vertical_pos(),
            self_message,
            text_width: text.width,
            text_height: text.height,
            sequence_number: m.sequence_number,
        });
        Ok(())
    }

    fn note(&mut self, n: &Note) -> Result<()> {
        self.bounds.bump_vertical_pos(self.conf.box_margin);
        let y = self.bounds.vertical_pos();

        let from = self.geom(&n.from)?;
        let to = self.geom(&n.to)?;
        let (x, width) = match n.placement {
            NotePlacement::RightOf => (
                from.x + (from.width + self.conf.actor_margin) / 2.0,
                self.conf.width,
            ),
            NotePlacement::LeftOf => (
                from.x - (from.width + self.conf.actor_margin) / 2.0,
                self.conf.width,
            ),
            NotePlacement::Over if n.from == n.to => (from.x, self.conf.width),
            NotePlacement::Over => {
                let force_width = (from.x - to.x).abs() + self.conf.actor_margin;
                (
                    (from.x + to.x + self.conf.width - force_width) / 2.0,
                    force_width,
                )
            }
        };

        let text = self.measure(
            &n.text,
            &self.note_style,
            n.wrap,
            width - 2.0 * self.conf.note_margin,
        );
        let height = text.height + 2.0 * self.conf.note_margin;
        self.bounds.insert(x, y, x + width, y + height);
        self.bounds.bump_vertical_pos(height);

        self.out.notes.push(LayoutNote {
            placement: n.placement,
            from: n.from.clone(),
            to: n.to.clone(),
            text: n.text.clone(),
            x,
            y,
            width,
            height,
        });
        Ok(())
    }

    fn activation_start(&mut self, actor: &'a str) -> Result<()> {
        let center = self.geom(actor)?.center();
        let stack = self.activations.entry(actor).or_default();
        let stacked = stack.len() as f64;
        let start_x = center + ((stacked - 1.0) * self.conf.activation_width) / 2.0;
        stack.push(OpenActivation {
            start_x,
            start_y: self.bounds.vertical_pos() + 2.0,
            stop_x: start_x + self.conf.activation_width,
        });
        Ok(())
    }

    fn activation_end(&mut self, actor: &str) -> Result<()> {
        let Some(mut open) = self.activations.get_mut(actor).and_then(Vec::pop) else {
            tracing::warn!(actor, "activation end without an open activation box");
            return Ok(());
        };
        let depth = self.activations.get(actor).map_or(0, Vec::len);

        let mut y = self.bounds.vertical_pos();
        if open.start_y + MIN_ACTIVATION_HEIGHT > y {
            open.start_y = y - 6.0;
            y += 12.0;
        }
        self.bounds.insert(open.start_x, y - 10.0, open.stop_x, y);
        self.out.activations.push(LayoutActivation {
            actor: actor.to_string(),
            start_x: open.start_x,
            start_y: open.start_y,
            stop_x: open.stop_x,
            stop_y: y,
            depth,
        });
        Ok(())
    }

    fn block(&mut self, marker: BlockMarker, label: &str) -> Result<()> {
        let margin = self.conf.box_margin;
        let labelled_gap = margin + self.conf.box_text_margin;

        if marker.is_start() {
            self.bounds.bump_vertical_pos(margin);
            self.bounds.new_loop();
            let gap = if marker == BlockMarker::RectStart {
                margin
            } else {
                labelled_gap
            };
            self.bounds.bump_vertical_pos(gap);
            self.open_blocks.push(OpenBlock {
                kind: marker.kind(),
                label: label.to_string(),
                section_labels: Vec::new(),
            });
            return Ok(());
        }

        if marker.is_section() {
            self.bounds.bump_vertical_pos(labelled_gap);
            let Some(open) = self
                .open_blocks
                .last_mut()
                .filter(|b| b.kind == marker.kind())
            else {
                return Err(Error::UnbalancedScope {
                    message: format!("{marker:?} outside of a matching block"),
                });
            };
            self.bounds.add_section();
            open.section_labels.push(label.to_string());
            self.bounds.bump_vertical_pos(margin);
            return Ok(());
        }

        let (Some(open), Some(scope)) = (self.open_blocks.pop(), self.bounds.end_loop()) else {
            return Err(Error::UnbalancedScope {
                message: format!("{marker:?} without an open block"),
            });
        };
        if open.kind != marker.kind() {
            return Err(Error::InvalidModel {
                message: format!("{marker:?} closes a {:?} block", open.kind),
            });
        }

        // Nothing was drawn inside: span the actor row instead of leaving x unbounded.
        let mut extent = scope.extent;
        if extent.start_x > extent.stop_x {
            let (row_start, row_stop) = self.actor_row_span();
            extent.start_x = row_start - margin;
            extent.stop_x = row_stop + margin;
            self.bounds
                .insert(extent.start_x, extent.start_y, extent.stop_x, extent.stop_y);
        }

        let sections = scope
            .sections
            .iter()
            .zip(open.section_labels)
            .map(|(y, label)| LayoutSection { y: *y, label })
            .collect();
        self.out.blocks.push(LayoutBlock {
            kind: open.kind,
            label: open.label,
            sections,
            bounds: extent,
        });
        self.bounds.bump_vertical_pos(margin);
        Ok(())
    }

    fn actor_row_span(&self) -> (f64, f64) {
        let start = self.out.actors.first().map_or(0.0, |a| a.x);
        let stop = self
            .out
            .actors
            .last()
            .map_or(start, |a| a.x + a.width);
        (start, stop)
    }

    fn finish(mut self) -> Result<SequenceDiagramLayout> {
        if let Some(open) = self.open_blocks.last() {
            return Err(Error::UnbalancedScope {
                message: format!("{:?} block is never closed", open.kind),
            });
        }

        // Activations still open at the end run down to the last event.
        let y = self.bounds.vertical_pos();
        let mut leftover: Vec<(&str, Vec<OpenActivation>)> = self.activations.drain().collect();
        leftover.sort_by(|a, b| a.0.cmp(b.0));
        for (actor, stack) in leftover {
            for (depth, open) in stack.into_iter().enumerate() {
                self.bounds.insert(open.start_x, open.start_y, open.stop_x, y);
                self.out.activations.push(LayoutActivation {
                    actor: actor.to_string(),
                    start_x: open.start_x,
                    start_y: open.start_y,
                    stop_x: open.stop_x,
                    stop_y: y,
                    depth,
                });
            }
        }

        if self.conf.mirror_actors {
            self.bounds.bump_vertical_pos(2.0 * self.conf.box_margin);
            let y = self.bounds.vertical_pos();
            for actor in &self.out.actors {
                self.bounds
                    .insert(actor.x, y, actor.x + actor.width, y + actor.height);
                self.out.mirrored_actors.push(LayoutActor {
                    y,
                    ..actor.clone()
                });
            }
            self.bounds.bump_vertical_pos(self.conf.height);
        }

        let bounds = self.bounds.get_bounds();
        let width = bounds.width() + 2.0 * self.conf.diagram_margin_x;
        let mut height = bounds.height() + 2.0 * self.conf.diagram_margin_y;
        if self.conf.mirror_actors {
            height = height - self.conf.box_margin + self.conf.bottom_margin_adj;
        }
        if self.out.title.is_some() {
            height += TITLE_HEIGHT;
        }

        self.out.bounds = bounds;
        self.out.width = width;
        self.out.height = height;
        Ok(self.out)
    }
}
