// document-synthesis-service/src/generators/feasibility.rs

use serde_json::json;
use tracing::info;

use crate::assembler::{Column, CoverPage, DocumentAssembler, SignatureParty, Table};
use crate::charts::{BarPoint, ChartHandle};
use crate::error::{DocumentError, Result};
use crate::finance::{self, Payback, Projection, Scenario, StudyInput};
use crate::generators::{GenerationContext, Generator};
use crate::locale::{LocaleBundle, LocalizationTable};
use crate::models::DocumentRequest;

const CHART_IDS: [&str; 3] = ["revenue", "cash_flow", "materials"];

/// Multi-scenario feasibility study of a tire recycling plant.
pub struct FeasibilityStudyGenerator {
    input: StudyInput,
    projection: Projection,
}

impl FeasibilityStudyGenerator {
    pub fn from_request(request: &DocumentRequest) -> Result<Self> {
        let input: StudyInput = serde_json::from_value(request.data.clone())
            .map_err(|e| DocumentError::InvalidStudyInput(e.to_string()))?;
        input.validate()?;
        let projection = finance::project(&input);

        info!(
            project = %input.project_name,
            country = %input.country,
            daily_capacity = input.daily_capacity,
            annual_revenue = projection.base.annual_revenue,
            npv = projection.cash_flow.npv,
            "Feasibility projection computed"
        );
        Ok(Self { input, projection })
    }

    fn money(&self, locale: &LocaleBundle, value: f64) -> String {
        locale.format_currency(value, &self.input.currency)
    }

    fn cover(&self, asm: &mut DocumentAssembler<'_>, ctx: &GenerationContext<'_>) {
        let locale = ctx.locale;
        let mut fields = vec![
            (locale.text("cover.prepared_for"), ctx.request.subject.clone()),
            (locale.text("cover.location"), self.country(locale)),
            (
                locale.text("cover.capacity"),
                locale.render(
                    "cover.capacity_value",
                    &json!({ "capacity": locale.format_number(self.input.daily_capacity, 0) }),
                ),
            ),
            (locale.text("cover.date"), locale.format_date(ctx.date)),
        ];
        if let Some(reference) = &ctx.request.options.reference {
            fields.push((locale.text("document.reference"), reference.clone()));
        }
        asm.cover(&CoverPage {
            company: ctx.branding.company_name.clone(),
            title: locale.text("feasibility.title"),
            subtitle: Some(locale.text("feasibility.subtitle")),
            fields,
            logo: ctx.assets.logo.as_ref(),
        });
    }

    fn country(&self, locale: &LocaleBundle) -> String {
        if self.input.country.trim().is_empty() {
            locale.text("common.not_applicable")
        } else {
            self.input.country.clone()
        }
    }

    fn executive_summary(&self, asm: &mut DocumentAssembler<'_>, locale: &LocaleBundle) {
        let base = &self.projection.base;
        let cash_flow = &self.projection.cash_flow;
        asm.section(&locale.text("section.executive_summary"));
        asm.paragraph(&locale.render(
            "summary.body",
            &json!({
                "capacity": locale.format_number(self.input.daily_capacity, 0),
                "country": self.country(locale),
                "days": locale.format_number(self.input.operating_days, 0),
                "utilization": locale.format_percent(self.input.utilization_rate, 0),
                "tonnage": locale.format_number(base.annual_tons, 0),
                "investment": self.money(locale, self.input.total_investment()),
            }),
        ));
        asm.paragraph(&locale.render(
            "summary.result",
            &json!({
                "revenue": self.money(locale, base.annual_revenue),
                "ebitda": self.money(locale, base.annual_ebitda),
                "roi": locale.format_percent(base.roi_pct, 1),
                "payback": payback_text(locale, base.payback),
            }),
        ));
        asm.paragraph(&locale.render(
            "summary.npv",
            &json!({
                "years": self.input.projection_years,
                "rate": locale.format_percent(cash_flow.discount_rate, 1),
                "npv": self.money(locale, cash_flow.npv),
                "irr": irr_text(locale, cash_flow.irr),
            }),
        ));
        if let Some(rate) = self.projection.break_even_utilization {
            asm.paragraph(&locale.render(
                "summary.break_even",
                &json!({ "rate": locale.format_percent(rate, 1) }),
            ));
        }
    }

    fn parameters(&self, asm: &mut DocumentAssembler<'_>, locale: &LocaleBundle) {
        let input = &self.input;
        asm.section(&locale.text("section.parameters"));
        asm.key_value_table(&[
            (locale.text("param.daily_capacity"), locale.format_number(input.daily_capacity, 1)),
            (locale.text("param.operating_days"), locale.format_number(input.operating_days, 0)),
            (
                locale.text("param.operating_hours"),
                locale.format_number(input.operating_hours_per_day, 0),
            ),
            (locale.text("param.utilization"), locale.format_percent(input.utilization_rate, 1)),
            (
                locale.text("param.annual_tonnage"),
                locale.format_number(self.projection.base.annual_tons, 0),
            ),
            (locale.text("param.variable_costs"), locale.format_percent(input.variable_cost_pct, 1)),
            (
                locale.text("param.financing"),
                format!(
                    "{} / {}",
                    locale.format_percent(input.financing.financed_pct, 1),
                    locale.format_percent(input.financing.interest_rate, 2)
                ),
            ),
            (locale.text("param.tax_rate"), locale.format_percent(input.tax_rate, 1)),
            (locale.text("param.discount_rate"), locale.format_percent(input.discount_rate, 1)),
            (locale.text("param.depreciation"), locale.format_number(input.depreciation_years, 0)),
        ]);
    }

    fn capex(&self, asm: &mut DocumentAssembler<'_>, locale: &LocaleBundle) {
        let capex = &self.input.capex;
        let total = capex.total();
        let share = |value: f64| locale.format_percent(value / total * 100.0, 1);
        let mut rows: Vec<Vec<String>> = [
            ("capex.equipment", capex.equipment),
            ("capex.installation", capex.installation),
            ("capex.infrastructure", capex.infrastructure),
            ("capex.working_capital", capex.working_capital),
        ]
        .iter()
        .map(|(key, value)| vec![locale.text(key), self.money(locale, *value), share(*value)])
        .collect();
        rows.push(vec![locale.text("capex.total"), self.money(locale, total), share(total)]);

        asm.section(&locale.text("section.capex"));
        asm.table(&Table {
            columns: vec![
                Column::left(locale.text("common.item"), 3.0),
                Column::right(locale.text("common.value"), 2.0),
                Column::right(locale.text("common.share"), 1.0),
            ],
            rows,
            total_row: true,
        });
    }

    fn revenue(&self, asm: &mut DocumentAssembler<'_>, locale: &LocaleBundle) {
        let base = &self.projection.base;
        let mut rows: Vec<Vec<String>> = base
            .materials
            .iter()
            .map(|m| {
                let effective_yield = if base.monthly_tons > 0.0 {
                    m.monthly_tons / base.monthly_tons * 100.0
                } else {
                    0.0
                };
                vec![
                    locale.text(m.material.label_key()),
                    locale.format_percent(effective_yield, 1),
                    locale.format_number(m.monthly_tons, 1),
                    self.money(locale, m.price_per_ton),
                    self.money(locale, m.monthly_revenue),
                    self.money(locale, m.monthly_revenue * 12.0),
                ]
            })
            .collect();
        let total_tons: f64 = base.materials.iter().map(|m| m.monthly_tons).sum();
        rows.push(vec![
            locale.text("common.total"),
            String::new(),
            locale.format_number(total_tons, 1),
            String::new(),
            self.money(locale, base.monthly_revenue),
            self.money(locale, base.annual_revenue),
        ]);

        asm.section(&locale.text("section.revenue"));
        asm.table(&Table {
            columns: vec![
                Column::left(locale.text("revenue.material"), 2.4),
                Column::right(locale.text("revenue.yield"), 1.0),
                Column::right(locale.text("revenue.monthly_tons"), 1.1),
                Column::right(locale.text("revenue.price"), 1.2),
                Column::right(locale.text("revenue.monthly"), 1.6),
                Column::right(locale.text("revenue.annual"), 1.7),
            ],
            rows,
            total_row: true,
        });
    }

    fn opex(&self, asm: &mut DocumentAssembler<'_>, locale: &LocaleBundle) {
        let opex = &self.input.opex;
        let mut rows: Vec<Vec<String>> = [
            ("opex.labor", opex.labor),
            ("opex.energy", opex.energy),
            ("opex.maintenance", opex.maintenance),
            ("opex.logistics", opex.logistics),
            ("opex.admin", opex.admin),
            ("opex.other", opex.other),
        ]
        .iter()
        .map(|(key, value)| {
            vec![locale.text(key), self.money(locale, *value), self.money(locale, value * 12.0)]
        })
        .collect();
        let monthly = opex.monthly_total();
        rows.push(vec![
            locale.text("opex.total"),
            self.money(locale, monthly),
            self.money(locale, monthly * 12.0),
        ]);

        asm.section(&locale.text("section.opex"));
        asm.table(&Table {
            columns: vec![
                Column::left(locale.text("common.item"), 3.0),
                Column::right(locale.text("opex.monthly"), 2.0),
                Column::right(locale.text("opex.annual"), 2.0),
            ],
            rows,
            total_row: true,
        });
    }

    fn scenarios(&self, asm: &mut DocumentAssembler<'_>, locale: &LocaleBundle) {
        let results: Vec<&finance::ScenarioResult> =
            Scenario::ALL.iter().map(|s| self.projection.scenario(*s)).collect();
        let row = |key: &str, cells: Vec<String>| {
            let mut row = vec![locale.text(key)];
            row.extend(cells);
            row
        };
        let each = |cell: fn(&Self, &LocaleBundle, &finance::ScenarioResult) -> String| -> Vec<String> {
            results.iter().map(|r| cell(self, locale, r)).collect()
        };
        let rows = vec![
            row("metric.utilization", each(|_, l, r| l.format_percent(r.utilization_rate, 0))),
            row("metric.annual_tons", each(|_, l, r| l.format_number(r.annual_tons, 0))),
            row("metric.annual_revenue", each(|g, l, r| g.money(l, r.annual_revenue))),
            row("metric.annual_opex", each(|g, l, r| g.money(l, r.monthly_opex * 12.0))),
            row("metric.ebitda", each(|g, l, r| g.money(l, r.annual_ebitda))),
            row("metric.net_profit", each(|g, l, r| g.money(l, r.annual_net_profit))),
            row("metric.roi", each(|_, l, r| l.format_percent(r.roi_pct, 1))),
            row("metric.payback", each(|_, l, r| payback_text(l, r.payback))),
            row(
                "metric.contribution_margin",
                each(|_, l, r| l.format_percent(r.contribution_margin_pct, 1)),
            ),
        ];

        let mut columns = vec![Column::left(locale.text("metric.indicator"), 2.2)];
        columns.extend(Scenario::ALL.iter().map(|s| Column::right(locale.text(s.label_key()), 1.6)));

        asm.section(&locale.text("section.scenarios"));
        asm.table(&Table { columns, rows, total_row: false });
    }

    fn cash_flow(&self, asm: &mut DocumentAssembler<'_>, locale: &LocaleBundle) {
        let analysis = &self.projection.cash_flow;
        let rows = analysis
            .years
            .iter()
            .map(|y| {
                vec![
                    y.year.to_string(),
                    self.money(locale, y.net_cash_flow),
                    self.money(locale, y.cumulative),
                    self.money(locale, y.discounted_cumulative),
                ]
            })
            .collect();

        asm.section(&locale.text("section.cash_flow"));
        asm.table(&Table {
            columns: vec![
                Column::left(locale.text("cashflow.year"), 0.8),
                Column::right(locale.text("cashflow.net"), 2.0),
                Column::right(locale.text("cashflow.cumulative"), 2.0),
                Column::right(locale.text("cashflow.discounted"), 2.0),
            ],
            rows,
            total_row: false,
        });
        asm.key_value_table(&[
            (
                locale.render(
                    "cashflow.npv",
                    &json!({ "rate": locale.format_percent(analysis.discount_rate, 1) }),
                ),
                self.money(locale, analysis.npv),
            ),
            (locale.text("cashflow.irr"), irr_text(locale, analysis.irr)),
            (
                locale.text("cashflow.payback_year"),
                analysis
                    .payback_year
                    .map(|y| y.to_string())
                    .unwrap_or_else(|| locale.text("payback.undefined")),
            ),
        ]);
    }

    fn sensitivity(&self, asm: &mut DocumentAssembler<'_>, locale: &LocaleBundle) {
        let analysis = &self.projection.sensitivity;
        let points = |value: f64| {
            let sign = if value > 0.0 { "+" } else { "" };
            format!("{sign}{}", locale.format_number(value, 1))
        };
        let rows = analysis
            .rows
            .iter()
            .map(|row| {
                vec![
                    locale.text(row.factor.label_key()),
                    locale.format_percent(row.roi_minus, 1),
                    locale.format_percent(row.roi_plus, 1),
                    format!("{} / {}", points(row.delta_minus), points(row.delta_plus)),
                ]
            })
            .collect();

        asm.section(&locale.text("section.sensitivity"));
        asm.paragraph(&locale.render(
            "sensitivity.intro",
            &json!({ "roi": locale.format_percent(analysis.base_roi, 1) }),
        ));
        asm.table(&Table {
            columns: vec![
                Column::left(locale.text("sensitivity.factor"), 2.0),
                Column::right(locale.text("sensitivity.minus"), 1.4),
                Column::right(locale.text("sensitivity.plus"), 1.4),
                Column::right(locale.text("sensitivity.delta"), 1.6),
            ],
            rows,
            total_row: false,
        });
    }

    fn government(&self, asm: &mut DocumentAssembler<'_>, locale: &LocaleBundle) {
        let Some(gov) = &self.projection.government else {
            return;
        };
        asm.section(&locale.text("section.government"));
        asm.paragraph(&locale.render(
            "gov.intro",
            &json!({
                "royalty": locale.format_percent(gov.royalty_pct, 1),
                "bonus": self.money(locale, gov.bonus_per_ton),
            }),
        ));
        asm.key_value_table(&[
            (locale.text("gov.royalty"), self.money(locale, gov.monthly_royalty)),
            (locale.text("gov.bonus"), self.money(locale, gov.monthly_bonus)),
            (locale.text("gov.net_revenue"), self.money(locale, gov.monthly_net_revenue)),
            (locale.text("gov.ebitda"), self.money(locale, gov.annual_ebitda)),
            (locale.text("gov.roi"), locale.format_percent(gov.roi_pct, 1)),
            (locale.text("gov.payback"), payback_text(locale, gov.payback)),
        ]);
    }

    fn charts(&self, asm: &mut DocumentAssembler<'_>, ctx: &GenerationContext<'_>) {
        if ctx.charts.is_empty() {
            return;
        }
        let locale = ctx.locale;
        asm.section(&locale.text("section.charts"));
        for asset in ctx.charts {
            let note_key = format!("chart.note.{}", asset.id);
            let note = if locale.contains(&note_key) {
                locale.text(&note_key)
            } else {
                locale.text("chart.note.default")
            };
            asm.chart(asset, Some(&note));
        }
    }

    fn regulatory(&self, asm: &mut DocumentAssembler<'_>, locale: &LocaleBundle) {
        let legal = LocalizationTable::global().country_legal_data(&self.input.country, locale.language());
        asm.section(&locale.text("section.regulatory"));
        asm.key_value_table(&[
            (locale.text("legal.regulation"), legal.regulation.clone()),
            (locale.text("legal.tax_credits"), legal.tax_credits.clone()),
            (locale.text("legal.co2_factor"), locale.format_number(legal.co2_factor, 2)),
            (
                locale.text("legal.co2_avoided"),
                locale.format_number(legal.co2_avoided(self.projection.base.annual_tons), 0),
            ),
            (locale.text("legal.jobs"), legal.jobs_per_plant.to_string()),
            (locale.text("legal.sdg"), legal.sdg_alignment.join(", ")),
        ]);
        if !legal.incentives.is_empty() {
            asm.subheading(&locale.text("legal.incentives"));
            asm.bullets(&legal.incentives);
        }
    }

    fn narrative(&self, asm: &mut DocumentAssembler<'_>, locale: &LocaleBundle) {
        asm.section(&locale.text("section.strengths"));
        asm.bullets(&locale.list("strength"));
        asm.section(&locale.text("section.risks"));
        asm.bullets(&locale.list("risk"));
        asm.section(&locale.text("section.recommendations"));
        asm.numbered(&locale.list("recommendation"));
    }

    fn due_diligence(&self, asm: &mut DocumentAssembler<'_>, ctx: &GenerationContext<'_>) {
        let notes = ctx.request.options.due_diligence.filled();
        if notes.is_empty() {
            return;
        }
        asm.section(&ctx.locale.text("section.due_diligence"));
        for (key, note) in notes {
            asm.subheading(&ctx.locale.text(key));
            asm.markup(note);
        }
    }

    fn analysis(&self, asm: &mut DocumentAssembler<'_>, ctx: &GenerationContext<'_>) {
        let Some(text) = ctx.request.analysis.as_deref().filter(|t| !t.trim().is_empty()) else {
            return;
        };
        asm.section(&ctx.locale.text("section.analysis"));
        asm.markup(text);
    }
}

impl Generator for FeasibilityStudyGenerator {
    fn title(&self, locale: &LocaleBundle) -> String {
        format!("{} | {}", locale.text("feasibility.title"), self.input.project_name)
    }

    fn chart_handles(&self, locale: &LocaleBundle) -> Vec<ChartHandle> {
        let revenue: Vec<BarPoint> = Scenario::ALL
            .iter()
            .map(|s| BarPoint::new(locale.text(s.label_key()), self.projection.scenario(*s).annual_revenue))
            .collect();
        let cash_flow: Vec<BarPoint> = self
            .projection
            .cash_flow
            .years
            .iter()
            .map(|y| BarPoint::new(y.year.to_string(), y.cumulative))
            .collect();
        let materials: Vec<BarPoint> = self
            .projection
            .base
            .materials
            .iter()
            .map(|m| BarPoint::new(locale.text(m.material.label_key()), m.monthly_revenue))
            .collect();

        CHART_IDS
            .iter()
            .zip([revenue, cash_flow, materials])
            .map(|(id, series)| ChartHandle::bars(id, locale.text(&format!("chart.{id}")), series))
            .collect()
    }

    fn assemble(&self, asm: &mut DocumentAssembler<'_>, ctx: &GenerationContext<'_>) -> Result<()> {
        let locale = ctx.locale;
        self.cover(asm, ctx);
        self.executive_summary(asm, locale);
        self.parameters(asm, locale);
        self.capex(asm, locale);
        self.revenue(asm, locale);
        self.opex(asm, locale);
        self.scenarios(asm, locale);
        self.cash_flow(asm, locale);
        self.sensitivity(asm, locale);
        self.government(asm, locale);
        self.charts(asm, ctx);
        self.regulatory(asm, locale);
        self.narrative(asm, locale);
        self.due_diligence(asm, ctx);
        self.analysis(asm, ctx);

        let options = &ctx.request.options;
        if options.include_signature || options.signature.is_some() {
            asm.page_break();
            asm.section(&locale.text("section.signature"));
            asm.signature_block(&[
                SignatureParty {
                    party: ctx.request.subject.clone(),
                    record: options.signature.as_ref(),
                },
                SignatureParty {
                    party: ctx.branding.company_name.clone(),
                    record: None,
                },
            ]);
        }
        if let Some(url) = options.qr_target_url.as_deref().filter(|u| !u.trim().is_empty()) {
            asm.section(&locale.text("section.partnership"));
            asm.qr_block(ctx.assets.qr.as_ref(), url);
        }
        Ok(())
    }
}

fn payback_text(locale: &LocaleBundle, payback: Payback) -> String {
    match payback {
        Payback::Months(months) => {
            locale.render("payback.months", &json!({ "months": locale.format_number(months, 1) }))
        }
        Payback::Undefined => locale.text("payback.undefined"),
    }
}

fn irr_text(locale: &LocaleBundle, irr: Option<f64>) -> String {
    irr.map(|rate| locale.format_percent(rate * 100.0, 1))
        .unwrap_or_else(|| locale.text("cashflow.irr_undefined"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::DocumentAssets;
    use crate::charts::ChartAsset;
    use crate::config::Config;
    use crate::finance::fixtures::reference_study;
    use crate::layout::PageGeometry;
    use crate::locale::Language;
    use crate::models::{DocumentKind, GenerationOptions};
    use crate::renderers::RecordingSurface;
    use chrono::NaiveDate;

    fn request(input: &StudyInput, options: GenerationOptions) -> DocumentRequest {
        DocumentRequest {
            request_id: "test".into(),
            kind: DocumentKind::FeasibilityStudy,
            language: Some("en".into()),
            subject: "Acme Tires".into(),
            data: serde_json::to_value(input).unwrap(),
            charts: vec![],
            analysis: Some("# Market\n- Sports surfaces\n- Molded goods".into()),
            options,
            formats: vec![],
        }
    }

    fn sections(request: &DocumentRequest, language: Language) -> (Vec<String>, RecordingSurface) {
        let generator = FeasibilityStudyGenerator::from_request(request).unwrap();
        let config = Config::defaults().unwrap();
        let locale = LocalizationTable::global().bundle(language);
        let charts: Vec<ChartAsset> = generator
            .chart_handles(locale)
            .into_iter()
            .map(|h| ChartAsset { id: h.id, caption: h.caption, aspect_ratio: h.aspect_ratio, image: None })
            .collect();
        let assets = DocumentAssets::default();
        let ctx = GenerationContext {
            request,
            locale,
            charts: &charts,
            assets: &assets,
            branding: &config.branding,
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        };
        let mut surface = RecordingSurface::new(PageGeometry::a4());
        let outline = {
            let mut asm = DocumentAssembler::new(&mut surface, locale, generator.title(locale));
            generator.assemble(&mut asm, &ctx).unwrap();
            asm.finish()
        };
        (outline.sections, surface)
    }

    #[test]
    fn sections_follow_the_study_order() {
        let (sections, _) = sections(&request(&reference_study(), GenerationOptions::default()), Language::En);
        assert_eq!(
            sections,
            vec![
                "cover",
                "Executive Summary",
                "Project Parameters",
                "Investment (CAPEX)",
                "Revenue by Material",
                "Operating Costs (OPEX)",
                "Scenario Comparison",
                "Cash Flow and Return",
                "Sensitivity Analysis",
                "Charts",
                "Regulatory and ESG Framework",
                "Strengths",
                "Risks",
                "Recommendations",
                "Analysis",
            ]
        );
    }

    #[test]
    fn optional_sections_appear_when_requested() {
        let mut study = reference_study();
        study.government_royalty_pct = Some(3.0);
        study.environmental_bonus_per_ton = Some(15.0);
        let mut options = GenerationOptions {
            include_signature: true,
            qr_target_url: Some("https://partners.example/form".into()),
            ..Default::default()
        };
        options.due_diligence.environmental = Some("Licence LO-2291 valid until 2029.".into());

        let (sections, surface) = sections(&request(&study, options), Language::En);
        for expected in ["Government Partnership Terms", "Due Diligence Checklist", "Signatures", "Partnership"] {
            assert!(sections.iter().any(|s| s == expected), "missing {expected}");
        }
        let gov = sections.iter().position(|s| s == "Government Partnership Terms").unwrap();
        let charts = sections.iter().position(|s| s == "Charts").unwrap();
        assert!(gov < charts);
        let last = surface.pages().len() - 1;
        assert!(surface.page_has_text(last, "https://partners.example/form"));
    }

    #[test]
    fn placeholder_is_drawn_for_every_missing_chart() {
        let (_, surface) = sections(&request(&reference_study(), GenerationOptions::default()), Language::En);
        let placeholders = surface
            .pages()
            .iter()
            .flat_map(|p| p.texts())
            .filter(|t| t.starts_with("Chart unavailable"))
            .count();
        assert_eq!(placeholders, 3);
    }

    #[test]
    fn localized_headings_are_used() {
        let (sections, _) = sections(&request(&reference_study(), GenerationOptions::default()), Language::It);
        assert_eq!(sections[1], "Sintesi");
    }

    #[test]
    fn invalid_study_is_rejected_before_layout() {
        let mut study = reference_study();
        study.daily_capacity = 0.0;
        let result = FeasibilityStudyGenerator::from_request(&request(&study, GenerationOptions::default()));
        assert!(matches!(result, Err(DocumentError::InvalidStudyInput(_))));

        let mut bad = request(&reference_study(), GenerationOptions::default());
        bad.data = serde_json::json!({ "projectName": "x" });
        assert!(matches!(
            FeasibilityStudyGenerator::from_request(&bad),
            Err(DocumentError::InvalidStudyInput(_))
        ));
    }
}
