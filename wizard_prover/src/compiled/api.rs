//! The builder API: the surface definer callbacks and compiler passes use
//! to populate a [CompiledIOP].

use tracing::info;
use wizard_shared_types::config::EngineConfig;
use wizard_shared_types::{domain, FieldExt};

use crate::accessor::Accessor;
use crate::coin::{Coin, CoinId, CoinKind};
use crate::column::{Column, ColumnId, NaturalColumn, Visibility};
use crate::query::{
    fixed_permutation::FixedPermutation,
    global::GlobalConstraint,
    inner_product::InnerProduct,
    local::{LocalConstraint, LocalOpening},
    mimc::MimcCompression,
    permutation::{Permutation, TableFragment},
    range::Range,
    univariate::UnivariateEval,
    Query, QueryId,
};
use crate::runtime::{ProverAction, VerifierAction};
use crate::smartvec::SmartVector;
use crate::symbolic::Expression;

use super::metadata::Metadata;
use super::{ColumnInfo, CompiledIOP, QueryRecord};

/// Borrows a [CompiledIOP] and tracks the current scope path and tag set.
/// Child builders from [Self::scoped] and [Self::tagged] reborrow the same
/// protocol.
pub struct Builder<'a, F: FieldExt> {
    comp: &'a mut CompiledIOP<F>,
    scope: Vec<String>,
    tags: Vec<String>,
}

impl<'a, F: FieldExt> Builder<'a, F> {
    pub fn root(comp: &'a mut CompiledIOP<F>) -> Self {
        Self {
            comp,
            scope: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Read-only view of the protocol being built, for compiler passes.
    pub fn compiled(&self) -> &CompiledIOP<F> {
        self.comp
    }

    /// A child builder with `name` appended to the scope path.
    pub fn scoped(&mut self, name: impl Into<String>) -> Builder<'_, F> {
        let mut scope = self.scope.clone();
        scope.push(name.into());
        Builder {
            comp: self.comp,
            scope,
            tags: self.tags.clone(),
        }
    }

    /// A child builder attaching `tag` to every declaration made through it.
    pub fn tagged(&mut self, tag: impl Into<String>) -> Builder<'_, F> {
        let mut tags = self.tags.clone();
        tags.push(tag.into());
        Builder {
            comp: self.comp,
            scope: self.scope.clone(),
            tags,
        }
    }

    fn metadata(&self, name: impl Into<String>) -> Metadata {
        Metadata::new(
            name,
            self.scope.clone(),
            self.tags.clone(),
            self.comp.config.capture_tracebacks,
        )
    }

    /// Declares a prover-assigned column of power-of-two `size` at `round`.
    pub fn commit(&mut self, name: impl Into<String>, round: usize, size: usize) -> Column<F> {
        self.declare_column(name, round, size, Visibility::Committed)
    }

    /// Declares a column whose assignment is known offline.
    pub fn precomputed(&mut self, name: impl Into<String>, values: SmartVector<F>) -> Column<F> {
        let column = self.declare_column(name, 0, values.len(), Visibility::Precomputed);
        if let Column::Natural(natural) = &column {
            self.comp.precomputed.insert(natural.id, values);
        }
        column
    }

    fn declare_column(
        &mut self,
        name: impl Into<String>,
        round: usize,
        size: usize,
        visibility: Visibility,
    ) -> Column<F> {
        domain::assert_power_of_two(size, "column size");
        let metadata = self.metadata(name);
        let id = ColumnId(self.comp.columns.len());
        let natural = NaturalColumn { id, round, size };
        self.comp
            .columns
            .insert(ColumnInfo { natural, visibility }, round, metadata);
        Column::Natural(natural)
    }

    /// Declares a field-element coin sampled at `round`. Coins cannot live
    /// at round 0: nothing has been absorbed yet, so there is nothing to
    /// bind them to.
    pub fn coin_field(&mut self, name: impl Into<String>, round: usize) -> Coin {
        self.declare_coin(name, round, CoinKind::Field)
    }

    /// Declares an integer-vector coin: `size` integers below the
    /// power-of-two `upper_bound`.
    pub fn coin_integer_vec(
        &mut self,
        name: impl Into<String>,
        round: usize,
        size: usize,
        upper_bound: usize,
    ) -> Coin {
        domain::assert_power_of_two(upper_bound, "integer coin upper bound");
        self.declare_coin(name, round, CoinKind::IntegerVec { size, upper_bound })
    }

    fn declare_coin(&mut self, name: impl Into<String>, round: usize, kind: CoinKind) -> Coin {
        assert!(round >= 1, "coins cannot be declared at round 0");
        let metadata = self.metadata(name);
        let id = CoinId(self.comp.coins.len());
        let coin = Coin { id, round, kind };
        self.comp.coins.insert(coin, round, metadata);
        coin
    }

    /// The expression must vanish at every row.
    pub fn global_constraint(&mut self, name: impl Into<String>, expr: Expression<F>) -> QueryId {
        let id = self.next_query_id();
        self.declare_query(name, Query::GlobalConstraint(GlobalConstraint { id, expr }))
    }

    /// The expression must vanish at row 0; shift the columns beforehand to
    /// target another row.
    pub fn local_constraint(&mut self, name: impl Into<String>, expr: Expression<F>) -> QueryId {
        let id = self.next_query_id();
        self.declare_query(name, Query::LocalConstraint(LocalConstraint { id, expr }))
    }

    /// Opens `column` at `position`; the returned accessor exposes the
    /// opened value to later-round expressions.
    pub fn local_opening(
        &mut self,
        name: impl Into<String>,
        column: Column<F>,
        position: usize,
    ) -> Accessor<F> {
        assert!(
            position < column.size(),
            "opening position {position} out of bounds for a column of size {}",
            column.size()
        );
        let id = self.next_query_id();
        let round = column.round();
        self.declare_query(
            name,
            Query::LocalOpening(LocalOpening { id, column, position }),
        );
        Accessor::LocalOpening { query: id, round }
    }

    pub fn inner_product(
        &mut self,
        name: impl Into<String>,
        a: Column<F>,
        b: Column<F>,
    ) -> QueryId {
        assert_eq!(a.size(), b.size(), "inner product over mismatched sizes");
        let id = self.next_query_id();
        self.declare_query(name, Query::InnerProduct(InnerProduct { id, a, b }))
    }

    /// Batched evaluation of `columns` at the shared `point`.
    pub fn univariate_eval(
        &mut self,
        name: impl Into<String>,
        columns: Vec<Column<F>>,
        point: Accessor<F>,
    ) -> QueryId {
        assert!(
            !columns.is_empty(),
            "univariate evaluation needs at least one column"
        );
        let id = self.next_query_id();
        self.declare_query(
            name,
            Query::UnivariateEval(UnivariateEval { id, columns, point }),
        )
    }

    /// The two tables must be row-permutations of each other.
    pub fn permutation(
        &mut self,
        name: impl Into<String>,
        a: Vec<TableFragment<F>>,
        b: Vec<TableFragment<F>>,
    ) -> QueryId {
        let id = self.next_query_id();
        self.declare_query(name, Query::Permutation(Permutation { id, a, b }))
    }

    /// Copy constraints under the fixed mapping `sigma`.
    pub fn fixed_permutation(
        &mut self,
        name: impl Into<String>,
        a: Vec<Column<F>>,
        b: Vec<Column<F>>,
        sigma: Vec<Vec<usize>>,
    ) -> QueryId {
        let id = self.next_query_id();
        self.declare_query(
            name,
            Query::FixedPermutation(FixedPermutation { id, a, b, sigma }),
        )
    }

    /// Every entry of `column` must lie in `[0, bound)`.
    pub fn range(&mut self, name: impl Into<String>, column: Column<F>, bound: usize) -> QueryId {
        let id = self.next_query_id();
        self.declare_query(name, Query::Range(Range { id, column, bound }))
    }

    /// Row-wise `new_state = compress(old_state, block)`.
    pub fn mimc_compression(
        &mut self,
        name: impl Into<String>,
        block: Column<F>,
        old_state: Column<F>,
        new_state: Column<F>,
    ) -> QueryId {
        let id = self.next_query_id();
        self.declare_query(
            name,
            Query::MimcCompression(MimcCompression {
                id,
                block,
                old_state,
                new_state,
            }),
        )
    }

    fn next_query_id(&self) -> QueryId {
        QueryId(self.comp.queries.len())
    }

    fn declare_query(&mut self, name: impl Into<String>, query: Query<F>) -> QueryId {
        let id = query.id();
        let round = query.round();
        let metadata = self.metadata(name);
        self.comp.queries.insert(
            QueryRecord {
                query,
                deferred_to_verifier: false,
                marked_compiled: false,
            },
            round,
            metadata,
        );
        id
    }

    /// Marks a query as skipping transcript absorption; the verifier then
    /// checks it directly.
    pub fn defer_to_verifier(&mut self, id: QueryId) {
        self.comp.queries.get_mut(id.0).deferred_to_verifier = true;
    }

    /// Marks a query as replaced by the current compiler pass.
    pub fn mark_query_compiled(&mut self, id: QueryId) {
        self.comp.queries.get_mut(id.0).marked_compiled = true;
    }

    /// Rewrites a column's visibility. Compiler passes use this to resolve
    /// committed and precomputed columns into runtime-executable ones.
    pub fn set_visibility(&mut self, id: ColumnId, visibility: Visibility) {
        self.comp.columns.get_mut(id.0).visibility = visibility;
    }

    pub fn register_prover_action(
        &mut self,
        name: impl Into<String>,
        round: usize,
        action: impl ProverAction<F> + 'static,
    ) {
        let metadata = self.metadata(name);
        self.comp
            .prover_actions
            .insert(Box::new(action), round, metadata);
    }

    pub fn register_verifier_action(
        &mut self,
        name: impl Into<String>,
        round: usize,
        action: impl VerifierAction<F> + 'static,
    ) {
        let metadata = self.metadata(name);
        self.comp
            .verifier_actions
            .insert(Box::new(action), round, metadata);
    }
}

/// Runs the definer callback and then each compiler pass in order over a
/// fresh protocol, equalizes the round registries and seals the result.
pub fn compile<F: FieldExt>(
    config: EngineConfig,
    definer: impl FnOnce(&mut Builder<F>),
    passes: &[&dyn Fn(&mut Builder<F>)],
) -> CompiledIOP<F> {
    let mut comp = CompiledIOP::new(config);
    {
        let mut builder = Builder::root(&mut comp);
        definer(&mut builder);
    }
    for pass in passes {
        let mut builder = Builder::root(&mut comp);
        pass(&mut builder);
    }
    comp.equalize_rounds();
    comp.seal();
    info!(
        rounds = comp.num_rounds(),
        columns = comp.columns.len(),
        coins = comp.coins.len(),
        queries = comp.queries.len(),
        "protocol compiled"
    );
    comp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler;
    use wizard_shared_types::Fr;

    fn two_round_protocol(api: &mut Builder<Fr>) {
        let col = api.commit("witness", 0, 4);
        let coin = api.coin_field("alpha", 1);
        api.global_constraint(
            "witness - alpha",
            col.expr() - Accessor::Coin(coin).expr(),
        );
    }

    #[test]
    fn registries_are_equalized_and_sealed() {
        let comp = compile(
            EngineConfig::default(),
            two_round_protocol,
            &[&compiler::dummy::compile],
        );
        assert_eq!(comp.num_rounds(), 2);
        for register_rounds in [
            comp.columns.num_rounds(),
            comp.coins.num_rounds(),
            comp.queries.num_rounds(),
            comp.prover_actions.num_rounds(),
            comp.verifier_actions.num_rounds(),
        ] {
            assert_eq!(register_rounds, 2);
        }
        comp.assert_compiled();
        let _ = comp.protocol_hash();
    }

    #[test]
    fn protocol_hash_depends_on_the_shape() {
        let a = compile::<Fr>(
            EngineConfig::default(),
            two_round_protocol,
            &[&compiler::dummy::compile],
        );
        let b = compile::<Fr>(
            EngineConfig::default(),
            |api| {
                two_round_protocol(api);
                api.commit("extra", 0, 4);
            },
            &[&compiler::dummy::compile],
        );
        assert_ne!(a.protocol_hash(), b.protocol_hash());
        // Recompiling the same shape reproduces the same hash.
        let c = compile::<Fr>(
            EngineConfig::default(),
            two_round_protocol,
            &[&compiler::dummy::compile],
        );
        assert_eq!(a.protocol_hash(), c.protocol_hash());
    }

    #[test]
    #[should_panic(expected = "coins cannot be declared at round 0")]
    fn round_zero_coin_rejected() {
        let mut comp = CompiledIOP::<Fr>::new(EngineConfig::default());
        let mut api = Builder::root(&mut comp);
        api.coin_field("bad", 0);
    }

    #[test]
    #[should_panic(expected = "run a compiler pass")]
    fn uncompiled_protocol_rejected() {
        let comp = compile::<Fr>(EngineConfig::default(), two_round_protocol, &[]);
        comp.assert_compiled();
    }

    #[test]
    fn scopes_and_tags_land_in_metadata() {
        let mut comp = CompiledIOP::<Fr>::new(EngineConfig::default());
        let mut api = Builder::root(&mut comp);
        {
            let mut scoped = api.scoped("lookup");
            let mut tagged = scoped.tagged("range-check");
            tagged.commit("limb", 0, 8);
        }
        let meta = comp.columns.metadata(0);
        assert_eq!(meta.full_name(), "lookup/limb");
        assert_eq!(meta.tags, vec!["range-check".to_string()]);
    }
}
