//! Cost engine: attaches spread, slippage and financing to a closed trade.
//!
//! An accounting overlay only. Entry and exit prices are never changed.

use super::financing::FinancingConfig;
use crate::domain::{CostBreakdown, ExecType, InstrumentContext, RawTrade, TradeRecord};
use crate::execution::ExecutionPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostEngine {
    pub policy: ExecutionPolicy,
    /// `None` disables financing.
    pub financing: Option<FinancingConfig>,
}

/// One broker fill of a trade, for cost purposes.
#[derive(Debug, Clone, Copy)]
struct Fill {
    price: f64,
    lots: f64,
    exec_type: ExecType,
}

#[derive(Debug, Clone, Copy, Default)]
struct FillCosts {
    notional: f64,
    spread: f64,
    slippage: f64,
}

impl Fill {
    fn costs(&self, ctx: &InstrumentContext) -> FillCosts {
        let slippage = if self.exec_type.pays_slippage() {
            ctx.price_to_usd(ctx.slippage_abs, self.lots)
        } else {
            0.0
        };
        FillCosts {
            notional: self.price * self.lots * ctx.contract_size,
            spread: ctx.price_to_usd(ctx.half_spread, self.lots),
            slippage,
        }
    }
}

impl CostEngine {
    pub fn new(policy: ExecutionPolicy) -> Self {
        Self {
            policy,
            financing: None,
        }
    }

    pub fn with_financing(mut self, financing: FinancingConfig) -> Self {
        self.financing = Some(financing);
        self
    }

    /// Full cost breakdown for one trade.
    pub fn breakdown(&self, trade: &RawTrade, ctx: &InstrumentContext) -> CostBreakdown {
        let entry = Fill {
            price: trade.entry_price,
            lots: trade.initial_position_size,
            exec_type: self.policy.classify_entry(),
        };
        let tp1 = trade.tp1_price.filter(|_| trade.tp1_executed).map(|price| Fill {
            price,
            lots: trade.initial_position_size * 0.5,
            exec_type: self.policy.classify_tp1(),
        });
        let exit = Fill {
            price: trade.exit_price,
            lots: trade.position_size,
            exec_type: self.policy.classify_exit(trade.exit_reason),
        };

        let entry_costs = entry.costs(ctx);
        let tp1_costs = tp1.map(|f| f.costs(ctx)).unwrap_or_default();
        let exit_costs = exit.costs(ctx);

        let financing = self
            .financing
            .as_ref()
            .map(|cfg| cfg.charge(trade, ctx))
            .unwrap_or_default();

        let spread_usd_total = entry_costs.spread + tp1_costs.spread + exit_costs.spread;
        let slippage_usd_total = entry_costs.slippage + tp1_costs.slippage + exit_costs.slippage;

        CostBreakdown {
            entry_exec_type: entry.exec_type,
            tp1_exec_type: tp1.map(|f| f.exec_type),
            exit_exec_type: exit.exec_type,
            entry_notional: entry_costs.notional,
            tp1_notional: tp1_costs.notional,
            exit_notional: exit_costs.notional,
            spread_usd_entry: entry_costs.spread,
            spread_usd_tp1: tp1_costs.spread,
            spread_usd_exit: exit_costs.spread,
            spread_usd_total,
            slippage_usd_entry: entry_costs.slippage,
            slippage_usd_tp1: tp1_costs.slippage,
            slippage_usd_exit: exit_costs.slippage,
            slippage_usd_total,
            financing_rollovers: financing.rollovers,
            financing_days: financing.days,
            financing_usd_overnight: financing.overnight,
            financing_usd_weekend: financing.weekend,
            financing_usd_total: financing.total,
            costs_usd_total: spread_usd_total + slippage_usd_total + financing.total,
        }
    }

    /// Attach costs and net P&L, producing the finished record.
    pub fn apply(&self, trade: RawTrade, ctx: &InstrumentContext) -> TradeRecord {
        let costs = self.breakdown(&trade, ctx);
        let pnl_net_usd = net_pnl(trade.pnl_usd, &costs);
        TradeRecord {
            strategy: None,
            trade,
            costs,
            pnl_net_usd,
        }
    }
}

/// `pnl_usd - (spread + slippage + financing)`, in exactly that form.
pub fn net_pnl(pnl_usd: f64, costs: &CostBreakdown) -> f64 {
    pnl_usd - (costs.spread_usd_total + costs.slippage_usd_total + costs.financing_usd_total)
}
