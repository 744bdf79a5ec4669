use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use produktmatch::report::{CHART_TITLE, EMPTY_SELECTION_HINT, NO_MATCHES_HINT};
use produktmatch::{
    CapabilityIndex, CombinationSize, CompanyId, CompanyProfile, Dataset, MatchOutcome, Product,
    Selection,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Products,
    Requirements,
    Matches,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Products => Page::Requirements,
            Page::Requirements => Page::Matches,
            Page::Matches => Page::Products,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Products => Page::Matches,
            Page::Requirements => Page::Products,
            Page::Matches => Page::Requirements,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Products => "Produkter",
            Page::Requirements => "Kapabilitetskrav",
            Page::Matches => "Match",
        }
    }
}

/// Which result list the Matches page shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchClass {
    Individual,
    Combination(CombinationSize),
}

impl MatchClass {
    pub fn title(&self) -> &str {
        match self {
            MatchClass::Individual => "Individuelle match",
            MatchClass::Combination(CombinationSize::Pair) => "Kombi - 2 virksomheder",
            MatchClass::Combination(CombinationSize::Triple) => "Kombi - 3 virksomheder",
        }
    }
}

/// One selectable line on the Matches page
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRow {
    pub label: String,
    pub members: Vec<CompanyId>,
}

pub struct App {
    pub dataset: Dataset,
    pub index: CapabilityIndex,
    pub selection: Selection,
    pub outcome: MatchOutcome,
    pub current_page: Page,
    pub match_class: MatchClass,
    pub product_state: TableState,
    pub requirement_state: TableState,
    pub match_state: TableState,
    pub show_detail: bool,
}

impl App {
    /// Starts on the first product; caller guarantees there is one
    pub fn new(dataset: Dataset) -> Self {
        let index = dataset.capability_index();
        let first = dataset.products().first().map(|p| p.id).unwrap_or_default();
        let selection = Selection::for_product(&dataset, first);
        let outcome = selection.evaluate(&index);

        let mut product_state = TableState::default();
        product_state.select(Some(0));

        let mut app = Self {
            dataset,
            index,
            selection,
            outcome,
            current_page: Page::Products,
            match_class: MatchClass::Individual,
            product_state,
            requirement_state: TableState::default(),
            match_state: TableState::default(),
            show_detail: false,
        };
        app.reset_cursors();
        app
    }

    pub fn current_product(&self) -> Option<&Product> {
        self.dataset.product(self.selection.product())
    }

    /// Switch to the product under the cursor; all its requirements selected
    pub fn choose_product(&mut self) {
        let Some(i) = self.product_state.selected() else {
            return;
        };
        let Some(product) = self.dataset.products().get(i) else {
            return;
        };

        self.selection = Selection::for_product(&self.dataset, product.id);
        self.recompute();
        self.current_page = Page::Requirements;
    }

    pub fn toggle_requirement(&mut self) {
        let Some(i) = self.requirement_state.selected() else {
            return;
        };
        let Some(id) = self.selection.requirements().get(i).map(|c| c.id) else {
            return;
        };

        self.selection.toggle(id);
        self.recompute();
        self.requirement_state.select(Some(i));
    }

    /// Re-run matching after the selection changed
    fn recompute(&mut self) {
        self.outcome = self.selection.evaluate(&self.index);
        self.reset_cursors();
    }

    fn reset_cursors(&mut self) {
        let first = |len: usize| if len == 0 { None } else { Some(0) };
        let requirements = self.selection.requirements().len();
        let matches = self.match_rows().len();
        self.requirement_state.select(first(requirements));
        self.match_state.select(first(matches));
    }

    pub fn set_match_class(&mut self, class: MatchClass) {
        self.match_class = class;
        let len = self.match_rows().len();
        self.match_state.select(if len == 0 { None } else { Some(0) });
    }

    /// Rows of the active result list, sorted by label
    pub fn match_rows(&self) -> Vec<MatchRow> {
        let Some(report) = self.outcome.report() else {
            return Vec::new();
        };

        match self.match_class {
            MatchClass::Individual => {
                let mut rows: Vec<MatchRow> = report
                    .full
                    .iter()
                    .map(|id| MatchRow {
                        label: self.index.display_name(*id),
                        members: vec![*id],
                    })
                    .collect();
                rows.sort_by(|a, b| a.label.cmp(&b.label));
                rows
            }
            MatchClass::Combination(size) => report
                .sorted_combinations(size)
                .into_iter()
                .map(|combo| MatchRow {
                    label: combo.label.clone(),
                    members: combo.members.clone(),
                })
                .collect(),
        }
    }

    /// Profiles of every company in the highlighted match
    pub fn selected_profiles(&self) -> Vec<CompanyProfile> {
        let rows = self.match_rows();
        self.match_state
            .selected()
            .and_then(|i| rows.get(i))
            .map(|row| {
                row.members
                    .iter()
                    .filter_map(|id| self.dataset.company_profile(*id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    fn active_list(&mut self) -> (usize, &mut TableState) {
        match self.current_page {
            Page::Products => (self.dataset.products().len(), &mut self.product_state),
            Page::Requirements => (
                self.selection.requirements().len(),
                &mut self.requirement_state,
            ),
            Page::Matches => (self.match_rows().len(), &mut self.match_state),
        }
    }

    pub fn next(&mut self) {
        let (len, state) = self.active_list();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (len, state) = self.active_list();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let (len, state) = self.active_list();
        if len == 0 {
            return;
        }
        let i = state.selected().map(|i| (i + 20).min(len - 1)).unwrap_or(0);
        state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let (len, state) = self.active_list();
        if len == 0 {
            return;
        }
        let i = state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Enter => match app.current_page {
                    Page::Products => app.choose_product(),
                    Page::Requirements => app.current_page = Page::Matches,
                    Page::Matches => app.toggle_detail(),
                },
                KeyCode::Char(' ') if app.current_page == Page::Requirements => {
                    app.toggle_requirement()
                }
                KeyCode::Char('1') if app.current_page == Page::Matches => {
                    app.set_match_class(MatchClass::Individual)
                }
                KeyCode::Char('2') if app.current_page == Page::Matches => {
                    app.set_match_class(MatchClass::Combination(CombinationSize::Pair))
                }
                KeyCode::Char('3') if app.current_page == Page::Matches => {
                    app.set_match_class(MatchClass::Combination(CombinationSize::Triple))
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Products => render_products(f, chunks[1], app),
        Page::Requirements => render_requirements(f, chunks[1], app),
        Page::Matches => {
            if app.show_detail {
                let content_chunks = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                    .split(chunks[1]);

                render_matches(f, content_chunks[0], app);
                render_detail_panel(f, content_chunks[1], app);
            } else {
                render_matches(f, chunks[1], app);
            }
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Products, Page::Requirements, Page::Matches];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    let product = app
        .current_product()
        .map(|p| p.name.clone())
        .unwrap_or_default();
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(product, Style::default().fg(Color::White)));

    if let Some(report) = app.outcome.report() {
        let summary = report.summary();
        tab_spans.push(Span::raw("  |  "));
        tab_spans.push(Span::styled(
            format!("1:{} 2:{} 3:{}", summary.individual, summary.pairs, summary.triples),
            Style::default().fg(Color::Green),
        ));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn list_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

fn render_products(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .dataset
        .products()
        .iter()
        .map(|p| {
            let krav = app.dataset.requirements_of(p.id).len();
            Row::new(vec![
                Cell::from(p.id.0.to_string()),
                Cell::from(truncate(&p.name, 50)),
                Cell::from(krav.to_string()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(20),
            Constraint::Length(6),
        ],
    )
    .header(header_row(&["Id", "Produkt", "Krav"]))
    .block(list_block(" Vælg produkt ".to_string()))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.product_state);
}

fn render_requirements(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .selection
        .choices()
        .into_iter()
        .map(|choice| {
            let (mark, color) = if choice.selected {
                ("[x]", Color::Green)
            } else {
                ("[ ]", Color::DarkGray)
            };
            Row::new(vec![
                Cell::from(mark).style(Style::default().fg(color)),
                Cell::from(choice.capability.name.clone()),
                Cell::from(choice.capability.id.0.to_string()),
            ])
        })
        .collect();

    if rows.is_empty() {
        let msg = Paragraph::new("  Produktet har ingen kapabilitetskrav.")
            .block(list_block(" Marker kapabilitetskrav ".to_string()));
        f.render_widget(msg, area);
        return;
    }

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(20),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["", "Kapabilitet", "Id"]))
    .block(list_block(" Marker kapabilitetskrav ".to_string()))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.requirement_state);
}

fn render_matches(f: &mut Frame, area: Rect, app: &mut App) {
    let hint = match &app.outcome {
        MatchOutcome::NoSelection => Some((EMPTY_SELECTION_HINT, Color::Yellow)),
        MatchOutcome::NoMatches => Some((NO_MATCHES_HINT, Color::Red)),
        MatchOutcome::Matches(_) => None,
    };
    if let Some((text, color)) = hint {
        let msg = Paragraph::new(Line::from(Span::styled(
            format!("  {}", text),
            Style::default().fg(color),
        )))
        .block(list_block(" Match ".to_string()));
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(0)])
        .split(area);

    let summary = app
        .outcome
        .report()
        .map(|r| r.summary())
        .unwrap_or_default();
    let data: Vec<(&str, u64)> = summary
        .rows()
        .iter()
        .map(|(label, count)| (*label, *count as u64))
        .collect();

    let chart = BarChart::default()
        .block(list_block(format!(" {} ", CHART_TITLE)))
        .data(data.as_slice())
        .bar_width(12)
        .bar_gap(3)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, chunks[0]);

    let rows: Vec<Row> = app
        .match_rows()
        .into_iter()
        .map(|row| Row::new(vec![Cell::from(row.label)]))
        .collect();
    let count = rows.len();

    let table = Table::new(rows, [Constraint::Min(20)])
        .block(list_block(format!(
            " {} ({}) ",
            app.match_class.title(),
            count
        )))
        .highlight_style(highlight())
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, chunks[1], &mut app.match_state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let profiles = app.selected_profiles();

    if profiles.is_empty() {
        let no_selection = Paragraph::new("No match selected").block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Virksomheder "),
        );
        f.render_widget(no_selection, area);
        return;
    }

    let label = |text: &'static str| {
        Span::styled(
            text,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )
    };
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    let mut content = vec![];
    for profile in &profiles {
        let company = &profile.company;
        content.push(Line::from(""));
        content.push(Line::from(Span::styled(
            format!("  {}", company.display_name()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )));
        content.push(Line::from(vec![label("  Lokation: "), Span::raw(field(&company.location))]));
        content.push(Line::from(vec![label("  Website: "), Span::raw(field(&company.website))]));
        content.push(Line::from(vec![
            label("  Egnethed: "),
            Span::raw(field(&company.suitability)),
        ]));
        content.push(Line::from(label("  Kapabiliteter:")));
        for cap in &profile.capabilities {
            content.push(Line::from(format!("    - {}", cap)));
        }
        content.push(Line::from("  ─────────────────────────────────────"));
    }
    content.push(Line::from(Span::styled(
        "  Press Enter to close",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )));

    let detail_panel = Paragraph::new(content)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Detaljer for virksomheder "),
        );

    f.render_widget(detail_panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    match app.current_page {
        Page::Products => {
            status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Select product | "));
        }
        Page::Requirements => {
            status_spans.push(Span::styled("Space", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Toggle | "));
            status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Matches | "));
        }
        Page::Matches => {
            status_spans.push(Span::styled("1/2/3", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Class | "));
            status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Details | "));
        }
    }

    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use produktmatch::{Capability, CapabilityId, Company, ProductId};

    fn app() -> App {
        let dataset = Dataset::from_parts(
            vec![Capability::new(1, "Fræsning"), Capability::new(2, "Svejsning")],
            vec![Product::new(10, "Beslag"), Product::new(11, "Aksel")],
            vec![Company::new(1, "Alfa"), Company::new(2, "Beta")],
            vec![
                (ProductId(10), CapabilityId(1)),
                (ProductId(10), CapabilityId(2)),
                (ProductId(11), CapabilityId(1)),
            ],
            vec![(CompanyId(1), CapabilityId(1)), (CompanyId(2), CapabilityId(2))],
        )
        .unwrap();
        App::new(dataset)
    }

    #[test]
    fn test_starts_on_first_product() {
        let app = app();
        assert_eq!(app.current_product().unwrap().name, "Beslag");
        assert_eq!(app.outcome.report().unwrap().pairs.len(), 1);
    }

    #[test]
    fn test_toggling_everything_off_shows_no_selection() {
        let mut app = app();
        app.current_page = Page::Requirements;
        app.toggle_requirement();
        app.next();
        app.toggle_requirement();

        assert_eq!(app.outcome, MatchOutcome::NoSelection);
        assert!(app.match_rows().is_empty());
    }

    #[test]
    fn test_pair_drill_down_lists_both_companies() {
        let mut app = app();
        app.current_page = Page::Matches;
        app.set_match_class(MatchClass::Combination(CombinationSize::Pair));

        let rows = app.match_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, "Alfa + Beta");

        let names: Vec<String> = app
            .selected_profiles()
            .iter()
            .map(|p| p.company.display_name())
            .collect();
        assert_eq!(names, vec!["Alfa", "Beta"]);
    }

    #[test]
    fn test_choose_second_product() {
        let mut app = app();
        app.next();
        app.choose_product();

        assert_eq!(app.current_page, Page::Requirements);
        assert_eq!(app.current_product().unwrap().name, "Aksel");
        assert_eq!(
            app.outcome.report().unwrap().full,
            [CompanyId(1)].into_iter().collect()
        );
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Fræsning", 20), "Fræsning");
        assert_eq!(truncate("Æblegrødsmaskine", 8), "Æbleg...");
    }
}
