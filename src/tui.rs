use std::io;
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Row, Table};

use crate::app::{ClassifyResult, EnrichResult, FilterResult, GeneSetsResult, SummaryResult};
use crate::view::{
    VolcanoPoint, VolcanoSeries, classified_points, dot_plot_rows, gene_table_rows, volcano_points,
};

const TABLE_MAX_ROWS: usize = 20;

/// Read-only terminal viewer for computed results. Quits on `q` or Esc.
pub struct Viewer;

impl Viewer {
    pub fn show_filter(result: &FilterResult) -> miette::Result<()> {
        let points = volcano_points(&result.genes);
        let header = format!(
            "{} | {} genes | up {} / down {} | sig >= {:.2}, |lfc| >= {:.2}",
            result.study,
            result.total,
            result.upregulated,
            result.downregulated,
            result.config.significance_threshold,
            result.config.fold_change_threshold,
        );
        run_viewer(move |frame| {
            let chunks = split_header_body(frame.area());
            render_header(frame, chunks[0], &header);
            render_volcano(frame, chunks[1], &points, "volcano");
        })
    }

    pub fn show_classify(result: &ClassifyResult) -> miette::Result<()> {
        let points = classified_points(&result.genes);
        let rows = gene_table_rows(&result.genes);
        let header = format!(
            "{} vs must [{}] not [{}] | mode {:?} | {} classified",
            result.base_study,
            result.must_studies.join(","),
            result.not_studies.join(","),
            result.combination_mode,
            result.genes.len(),
        );
        run_viewer(move |frame| {
            let chunks = split_header_body(frame.area());
            render_header(frame, chunks[0], &header);
            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);
            render_volcano(frame, body[0], &points, "overlap volcano");

            let table_rows: Vec<Row> = rows
                .iter()
                .take(TABLE_MAX_ROWS)
                .map(|row| {
                    Row::new(vec![
                        row.gene.clone(),
                        row.log2_fold_change.clone(),
                        row.pvalue.clone(),
                        row.class.clone(),
                        row.source.clone(),
                    ])
                })
                .collect();
            let table = Table::new(
                table_rows,
                [
                    Constraint::Length(12),
                    Constraint::Length(8),
                    Constraint::Length(10),
                    Constraint::Length(13),
                    Constraint::Min(10),
                ],
            )
            .header(
                Row::new(vec!["gene", "log2FC", "p-value", "type", "source"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(Block::default().borders(Borders::ALL).title("genes"));
            frame.render_widget(table, body[1]);
        })
    }

    pub fn show_enrich(result: &EnrichResult) -> miette::Result<()> {
        let mut all_terms = Vec::new();
        let mut errors = Vec::new();
        for item in &result.items {
            all_terms.extend(item.terms.iter().cloned());
            if let Some(error) = &item.error {
                errors.push(format!("{}: {}", item.study, error));
            }
        }
        let rows = dot_plot_rows(&all_terms, result.metric);
        let header = format!(
            "gene set {} | cutoff {} | top {} by {} | {} studies, {} failed",
            result.gene_set,
            result.cutoff,
            result.top_n,
            result.metric,
            result.items.len(),
            errors.len(),
        );
        run_viewer(move |frame| {
            let chunks = split_header_body(frame.area());
            render_header(frame, chunks[0], &header);

            let table_rows: Vec<Row> = rows
                .iter()
                .take(TABLE_MAX_ROWS * 2)
                .map(|row| {
                    Row::new(vec![
                        row.term.clone(),
                        row.study.clone(),
                        row.result_type.clone(),
                        format!("{:.1}%", row.size),
                        format!("{:.3}", row.value),
                        row.gene_count.to_string(),
                    ])
                })
                .collect();
            let table = Table::new(
                table_rows,
                [
                    Constraint::Min(24),
                    Constraint::Length(14),
                    Constraint::Length(16),
                    Constraint::Length(8),
                    Constraint::Length(10),
                    Constraint::Length(6),
                ],
            )
            .header(
                Row::new(vec!["term", "study", "result type", "overlap", "value", "genes"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(Block::default().borders(Borders::ALL).title("enriched terms"));
            frame.render_widget(table, chunks[1]);

            if !errors.is_empty() {
                let area = error_strip(chunks[1]);
                let text = Paragraph::new(errors.join(" | "))
                    .style(Style::default().fg(Color::Red))
                    .block(Block::default().borders(Borders::ALL).title("errors"));
                frame.render_widget(text, area);
            }
        })
    }

    pub fn show_gene_sets(result: &GeneSetsResult) -> miette::Result<()> {
        let lines: Vec<Line> = result
            .gene_sets
            .iter()
            .map(|name| Line::from(name.clone()))
            .collect();
        run_viewer(move |frame| {
            let paragraph = Paragraph::new(lines.clone())
                .block(Block::default().borders(Borders::ALL).title("gene sets"));
            frame.render_widget(paragraph, frame.area());
        })
    }

    pub fn show_summary(result: &SummaryResult) -> miette::Result<()> {
        let header = format!(
            "{} studies | sig >= {:.2}, |lfc| >= {:.2} | cache: {} fetches, {} hits",
            result.studies.len(),
            result.config.significance_threshold,
            result.config.fold_change_threshold,
            result.cache.fetches,
            result.cache.hits,
        );
        let rows: Vec<(String, String, String, String, String)> = result
            .studies
            .iter()
            .map(|s| {
                (
                    s.study.clone(),
                    s.kind.to_string(),
                    s.genes.to_string(),
                    format!("{} / {}", s.upregulated, s.downregulated),
                    s.error.clone().unwrap_or_default(),
                )
            })
            .collect();
        run_viewer(move |frame| {
            let chunks = split_header_body(frame.area());
            render_header(frame, chunks[0], &header);
            let table_rows: Vec<Row> = rows
                .iter()
                .map(|(study, kind, genes, updown, error)| {
                    let style = if error.is_empty() {
                        Style::default()
                    } else {
                        Style::default().fg(Color::Red)
                    };
                    Row::new(vec![
                        study.clone(),
                        kind.clone(),
                        genes.clone(),
                        updown.clone(),
                        error.clone(),
                    ])
                    .style(style)
                })
                .collect();
            let table = Table::new(
                table_rows,
                [
                    Constraint::Length(20),
                    Constraint::Length(10),
                    Constraint::Length(8),
                    Constraint::Length(12),
                    Constraint::Min(10),
                ],
            )
            .header(
                Row::new(vec!["study", "kind", "genes", "up / down", "error"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(Block::default().borders(Borders::ALL).title("studies"));
            frame.render_widget(table, chunks[1]);
        })
    }
}

fn run_viewer<F>(render: F) -> miette::Result<()>
where
    F: Fn(&mut ratatui::Frame),
{
    enable_raw_mode().into_diagnostic()?;
    io::stdout().execute(EnterAlternateScreen).into_diagnostic()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend).into_diagnostic()?;

    let outcome = viewer_loop(&mut terminal, render);

    disable_raw_mode().into_diagnostic()?;
    io::stdout().execute(LeaveAlternateScreen).into_diagnostic()?;
    outcome
}

fn viewer_loop<F>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    render: F,
) -> miette::Result<()>
where
    F: Fn(&mut ratatui::Frame),
{
    loop {
        terminal.draw(|frame| render(frame)).into_diagnostic()?;
        if !event::poll(Duration::from_millis(200)).into_diagnostic()? {
            continue;
        }
        if let Event::Key(key) = event::read().into_diagnostic()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                return Ok(());
            }
        }
    }
}

fn split_header_body(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area)
}

fn render_header(frame: &mut ratatui::Frame, area: Rect, text: &str) {
    let paragraph = Paragraph::new(Line::from(vec![
        Span::styled(text.to_string(), Style::default().fg(Color::Cyan)),
        Span::raw("  (q to quit)"),
    ]))
    .block(Block::default().borders(Borders::ALL).title("dge-scope"));
    frame.render_widget(paragraph, area);
}

fn series_color(series: VolcanoSeries) -> Color {
    match series {
        VolcanoSeries::Upregulated => Color::Red,
        VolcanoSeries::Downregulated => Color::Blue,
        VolcanoSeries::NotSignificant => Color::DarkGray,
        VolcanoSeries::Base => Color::Cyan,
        VolcanoSeries::OverlapMust => Color::Green,
        VolcanoSeries::OverlapNot => Color::Magenta,
        VolcanoSeries::OverlapBoth => Color::Yellow,
    }
}

fn series_label(series: VolcanoSeries) -> &'static str {
    match series {
        VolcanoSeries::Upregulated => "up",
        VolcanoSeries::Downregulated => "down",
        VolcanoSeries::NotSignificant => "ns",
        VolcanoSeries::Base => "base",
        VolcanoSeries::OverlapMust => "must",
        VolcanoSeries::OverlapNot => "not",
        VolcanoSeries::OverlapBoth => "both",
    }
}

fn render_volcano(frame: &mut ratatui::Frame, area: Rect, points: &[VolcanoPoint], title: &str) {
    let series_order = [
        VolcanoSeries::NotSignificant,
        VolcanoSeries::Base,
        VolcanoSeries::Upregulated,
        VolcanoSeries::Downregulated,
        VolcanoSeries::OverlapMust,
        VolcanoSeries::OverlapNot,
        VolcanoSeries::OverlapBoth,
    ];
    let grouped: Vec<(VolcanoSeries, Vec<(f64, f64)>)> = series_order
        .iter()
        .map(|&series| {
            (
                series,
                points
                    .iter()
                    .filter(|p| p.series == series)
                    .map(|p| (p.x, p.y))
                    .collect::<Vec<_>>(),
            )
        })
        .filter(|(_, data)| !data.is_empty())
        .collect();

    let x_max = points
        .iter()
        .map(|p| p.x.abs())
        .fold(1.0_f64, f64::max)
        .ceil();
    let y_max = points.iter().map(|p| p.y).fold(1.0_f64, f64::max).ceil();

    let datasets: Vec<Dataset> = grouped
        .iter()
        .map(|(series, data)| {
            Dataset::default()
                .name(series_label(*series))
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(series_color(*series)))
                .data(data)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .x_axis(
            Axis::default()
                .title("log2 fold change")
                .bounds([-x_max, x_max])
                .labels([
                    format!("{:.0}", -x_max),
                    "0".to_string(),
                    format!("{:.0}", x_max),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("-log10(p)")
                .bounds([0.0, y_max])
                .labels(["0".to_string(), format!("{:.0}", y_max)]),
        );
    frame.render_widget(chart, area);
}

fn error_strip(area: Rect) -> Rect {
    let height = 3.min(area.height);
    Rect {
        x: area.x,
        y: area.y + area.height - height,
        width: area.width,
        height,
    }
}
