//! Parser for .fir files.

use fir::{
    BinaryOp, Block, CastOp, CmpOp, FuncRef, Function, FunctionSignature, InstructionData, Param,
    PhiNode, RmwOp, Type, UnaryOp, Value, ValueDef,
};

use crate::error::{Location, ParseResult};
use crate::lexer::{LexError, Lexer, LocatedError, LocatedToken, Token};
use crate::ParseError;

#[cfg(test)]
mod tests;

/// After some quick benchmarks a program should never have more than 100,000 blocks.
const MAX_BLOCKS_IN_A_FUNCTION: u32 = 100_000;
const MAX_VALUES_IN_A_FUNCTION: u32 = 10_000_000;

/// Parse the entire `text` into a list of functions.
pub fn parse_functions(text: &str) -> ParseResult<Vec<Function>> {
    let mut parser = Parser::new(text);
    let res = parser.parse_function_list();
    parser.prefer_lex_error(res)
}

/// Parse the entire `text` into a function
pub fn parse_function(text: &str) -> ParseResult<Function> {
    let mut parser = Parser::new(text);
    let res = parser.parse_function().and_then(|func| {
        if parser.token().is_some() {
            return err!(parser.loc, "expected end of input after function");
        }
        Ok(func)
    });
    parser.prefer_lex_error(res)
}

pub struct Parser<'a> {
    lex: Lexer<'a>,

    lex_error: Option<LexError>,

    /// Current lookahead token.
    lookahead: Option<Token<'a>>,

    /// Location of lookahead.
    loc: Location,
}

/// Whether an instruction defines a value.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Results {
    None,
    One,
    Optional,
}

/// Context for resolving references when parsing a single function.
struct Context {
    function: Function,
}

impl Context {
    fn new(f: Function) -> Self {
        Self { function: f }
    }

    // Allocate a new signature. Signatures must be declared in order.
    fn add_sig(&mut self, sig: FuncRef, data: FunctionSignature, loc: Location) -> ParseResult<()> {
        if self.function.dfg.signatures.next_key() != sig {
            return err!(loc, "expected {} to be declared next, found {}", self.function.dfg.signatures.next_key(), sig);
        }
        self.function.import_function(data);
        Ok(())
    }

    fn ensure_block(&mut self, block: Block) {
        while self.function.layout.num_blocks() <= usize::from(block) {
            self.function.layout.make_block();
        }
    }

    fn ensure_value(&mut self, val: Value) {
        while self.function.dfg.num_values() <= usize::from(val) {
            self.function.dfg.make_invalid_value();
        }
    }

    // Insert a new block into the layout.
    fn add_block(&mut self, block: Block, loc: Location) -> ParseResult<Block> {
        self.ensure_block(block);
        if self.function.layout.is_block_inserted(block) {
            return err!(loc, "duplicate definition of {}", block);
        }
        self.function.layout.append_block(block);
        Ok(block)
    }

    fn define_value(&mut self, val: Value, def: ValueDef, ty: Type, loc: Location) -> ParseResult<()> {
        self.ensure_value(val);
        if self.function.dfg.value_def(val) != ValueDef::Invalid {
            return err!(loc, "duplicate definition of {}", val);
        }
        self.function.dfg.define_value(val, def, ty);
        Ok(())
    }
}

impl<'a> Parser<'a> {
    /// Create a new `Parser` which reads `text`. The referenced text must outlive the parser.
    pub fn new(text: &'a str) -> Self {
        Self { lex: Lexer::new(text), lex_error: None, lookahead: None, loc: Location { line_number: 0 } }
    }

    // Consume the current lookahead token and return it.
    fn consume(&mut self) -> Token<'a> {
        self.lookahead.take().expect("No token to consume")
    }

    // Get the current lookahead token, after making sure there is one. Comments are skipped.
    fn token(&mut self) -> Option<Token<'a>> {
        while self.lookahead.is_none() && self.lex_error.is_none() {
            match self.lex.next() {
                Some(Ok(LocatedToken { token: Token::Comment(_), .. })) => continue,
                Some(Ok(LocatedToken { token, location })) => {
                    self.lookahead = Some(token);
                    self.loc = location;
                }
                Some(Err(LocatedError { error, location })) => {
                    self.lex_error = Some(error);
                    self.loc = location;
                    break;
                }
                None => break,
            }
        }
        self.lookahead
    }

    // A lexer error ends the token stream early, so any parse error that follows is a consequence.
    fn prefer_lex_error<T>(&self, res: ParseResult<T>) -> ParseResult<T> {
        self.check_lex_error()?;
        res
    }

    fn check_lex_error(&self) -> ParseResult<()> {
        match self.lex_error {
            Some(LexError::InvalidChar) => err!(self.loc, "invalid character"),
            Some(LexError::UnterminatedString) => err!(self.loc, "unterminated string"),
            Some(LexError::MalformedReference) => err!(self.loc, "malformed entity reference"),
            None => Ok(()),
        }
    }

    // Match and consume a token without payload.
    fn match_token(&mut self, want: Token<'a>, err_msg: &str) -> ParseResult<Token<'a>> {
        if self.token() == Some(want) {
            Ok(self.consume())
        } else {
            self.check_lex_error()?;
            err!(self.loc, err_msg)
        }
    }

    // If the next token is a `want`, consume it, otherwise do nothing.
    fn optional(&mut self, want: Token<'a>) -> bool {
        if self.token() == Some(want) {
            self.consume();
            true
        } else {
            false
        }
    }

    // Match and consume a specific keyword.
    // Used for pseudo-keywords like "inbounds" that only appear in certain contexts.
    fn match_keyword(&mut self, want: &'static str, err_msg: &str) -> ParseResult<Token<'a>> {
        if self.token() == Some(Token::Keyword(want)) {
            Ok(self.consume())
        } else {
            self.check_lex_error()?;
            err!(self.loc, err_msg)
        }
    }

    // Match and consume a function reference.
    fn match_fn(&mut self, err_msg: &str) -> ParseResult<FuncRef> {
        if let Some(Token::FuncRef(fnref)) = self.token() {
            self.consume();
            Ok(fnref)
        } else {
            err!(self.loc, err_msg)
        }
    }

    // Match and consume a block reference.
    fn match_block(&mut self, ctx: &mut Context, err_msg: &str) -> ParseResult<Block> {
        if let Some(Token::Block(block)) = self.token() {
            if block.as_u32() >= MAX_BLOCKS_IN_A_FUNCTION {
                return Err(self.error("too many blocks"));
            }
            ctx.ensure_block(block);
            self.consume();
            Ok(block)
        } else {
            err!(self.loc, err_msg)
        }
    }

    // Match and consume a value reference.
    fn match_value(&mut self, ctx: &mut Context, err_msg: &str) -> ParseResult<Value> {
        if let Some(Token::Value(v)) = self.token() {
            if v.as_u32() >= MAX_VALUES_IN_A_FUNCTION {
                return Err(self.error("too many values"));
            }
            ctx.ensure_value(v);
            self.consume();
            Ok(v)
        } else {
            err!(self.loc, err_msg)
        }
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError { location: self.loc, message: message.to_string(), is_warning: false }
    }

    // Match and consume an integer immediate.
    fn match_imm(&mut self, err_msg: &str) -> ParseResult<i64> {
        if let Some(Token::Integer(text)) = self.token() {
            self.consume();
            let negative = text.starts_with('-');
            // Strip sign prefix.
            let digits = text.trim_start_matches(['-', '+']);
            let digits = digits.replace('_', "");

            let value = if let Some(hex) = digits.strip_prefix("0x") {
                u64::from_str_radix(hex, 16)
                    .map_err(|_| self.error("unable to parse value as a hexadecimal immediate"))?
                    as i64
            } else {
                digits.parse::<u64>().map_err(|_| self.error("expected decimal immediate"))? as i64
            };

            Ok(if negative { value.wrapping_neg() } else { value })
        } else {
            err!(self.loc, err_msg)
        }
    }

    fn match_u32(&mut self, err_msg: &str) -> ParseResult<u32> {
        let val = self.match_imm(err_msg)?;
        u32::try_from(val).map_err(|_| self.error("immediate out of range"))
    }

    fn match_str(&mut self, err_msg: &str) -> ParseResult<&'a str> {
        if let Some(Token::String(text)) = self.token() {
            self.consume();
            Ok(text)
        } else {
            err!(self.loc, err_msg)
        }
    }

    // Match and consume any keyword, such as an opcode.
    fn match_any_keyword(&mut self, err_msg: &str) -> ParseResult<&'a str> {
        if let Some(Token::Keyword(text)) = self.token() {
            self.consume();
            Ok(text)
        } else {
            err!(self.loc, err_msg)
        }
    }

    // Parse an optional `:ptr` type annotation.
    fn optional_type(&mut self) -> ParseResult<Option<Type>> {
        if self.optional(Token::Colon) {
            self.match_keyword("ptr", "expected type 'ptr'")?;
            Ok(Some(Type::Ptr))
        } else {
            Ok(None)
        }
    }

    /// Parse a list of function definitions.
    ///
    /// This is the top-level parse function matching the whole contents of a file.
    pub fn parse_function_list(&mut self) -> ParseResult<Vec<Function>> {
        let mut list = Vec::new();
        while self.token().is_some() {
            list.push(self.parse_function()?);
        }
        self.check_lex_error()?;
        Ok(list)
    }

    // Parse a whole function definition.
    //
    // function ::= * "function" name params "{" preamble function-body "}"
    //
    fn parse_function(&mut self) -> ParseResult<Function> {
        self.match_keyword("function", "expected 'function'")?;

        // function ::= "function" * name params "{" preamble function-body "}"
        let name = self.parse_external_name()?;

        let mut ctx = Context::new(Function::with_name(name));
        self.parse_func_params(&mut ctx)?;

        // function ::= "function" name params * "{" preamble function-body "}"
        self.match_token(Token::LBrace, "expected '{' before function body")?;

        // function ::= "function" name params "{" * preamble function-body "}"
        self.parse_preamble(&mut ctx)?;
        // function ::= "function" name params "{"  preamble * function-body "}"
        self.parse_function_body(&mut ctx)?;
        // function ::= "function" name params "{" preamble function-body * "}"
        self.match_token(Token::RBrace, "expected '}' after function body")?;

        self.verify_function(&ctx.function)?;
        Ok(ctx.function)
    }

    // Parse the function preamble.
    //
    // preamble      ::= * { preamble-decl }
    // preamble-decl ::= * function-decl
    //                   * constant-decl
    //                   * global-decl
    //
    // The parsed decls are added to `ctx` rather than returned.
    fn parse_preamble(&mut self, ctx: &mut Context) -> ParseResult<()> {
        loop {
            match self.token() {
                Some(Token::FuncRef(..)) => {
                    let loc = self.loc;
                    let (fn_, data) = self.parse_signature_decl()?;
                    ctx.add_sig(fn_, data, loc)?;
                }
                Some(Token::Value(dst)) => {
                    let loc = self.loc;
                    self.consume();
                    let ty = self.optional_type()?;
                    self.match_token(Token::Equal, "expected '=' after constant")?;

                    match self.token() {
                        Some(Token::Keyword("iconst")) => {
                            self.consume();
                            let val = self.match_imm("expected int value")?;
                            ctx.define_value(dst, ValueDef::Const(val), Type::Scalar, loc)?;
                        }
                        Some(Token::Keyword("global")) => {
                            self.consume();
                            if ty != Some(Type::Ptr) {
                                return err!(loc, "global {} must be declared as 'ptr'", dst);
                            }
                            let name = self.parse_external_name()?;
                            ctx.ensure_value(dst);
                            if ctx.function.dfg.value_def(dst) != ValueDef::Invalid {
                                return err!(loc, "duplicate definition of {}", dst);
                            }
                            ctx.function.dfg.define_global(dst, name);
                        }
                        _ => return err!(self.loc, "expected 'iconst', 'global' or function signature"),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    // Parse an external name.
    //
    // For example, in a function decl, the parser would be in this state:
    //
    // function ::= "function" * name signature { ... }
    //
    fn parse_external_name(&mut self) -> ParseResult<String> {
        match self.token() {
            Some(Token::Name(s)) if !s.is_empty() => {
                self.consume();
                Ok(s.to_owned())
            }
            _ => err!(self.loc, "expected external name"),
        }
    }

    // Parse a function signature.
    //
    // signature ::=  * ("fn" | "intrinsic") "%"name "(" argcount ")" ["->" retcount]
    //
    fn parse_signature(&mut self) -> ParseResult<FunctionSignature> {
        let intrinsic = match self.match_any_keyword("expected 'fn' or 'intrinsic'")? {
            "fn" => false,
            "intrinsic" => true,
            kind => return err!(self.loc, "expected 'fn' or 'intrinsic', found '{}'", kind),
        };
        let name = self.parse_external_name()?;

        self.match_token(Token::LPar, "expected function signature: ( args... )")?;
        let params = self.match_imm("expected integer")?;
        let params = u16::try_from(params).map_err(|_| self.error("too many parameters"))?;
        self.match_token(Token::RPar, "expected ')' after function arguments")?;
        let returns = if self.optional(Token::Arrow) {
            match self.match_imm("expected integer")? {
                0 => false,
                1 => true,
                _ => return err!(self.loc, "functions return at most one value"),
            }
        } else {
            false
        };

        Ok(if intrinsic {
            FunctionSignature::intrinsic(name, params, returns)
        } else {
            FunctionSignature::external(name, params, returns)
        })
    }

    // Parse a signature decl.
    //
    // signature-decl ::= FuncRef(fnref) "=" signature
    //
    fn parse_signature_decl(&mut self) -> ParseResult<(FuncRef, FunctionSignature)> {
        let sig = self.match_fn("expected function reference: fn«n»")?;
        self.match_token(Token::Equal, "expected '=' in function decl")?;
        let data = self.parse_signature()?;
        Ok((sig, data))
    }

    // Parse a function body, add contents to `ctx`.
    //
    // function-body ::= * { basic-block }
    //
    fn parse_function_body(&mut self, ctx: &mut Context) -> ParseResult<()> {
        while matches!(self.token(), Some(Token::Block(_))) {
            self.parse_basic_block(ctx)?;
        }
        Ok(())
    }

    // Parse a basic block, add contents to `ctx`.
    //
    // basic-block  ::= * block-header { instruction }
    // block-header ::= Block(block) ":"
    //
    fn parse_basic_block(&mut self, ctx: &mut Context) -> ParseResult<()> {
        let loc = self.loc;
        let block_num = self.match_block(ctx, "expected block header")?;
        let block = ctx.add_block(block_num, loc)?;

        self.match_token(Token::Colon, "expected ':' after block header")?;

        // basic-block ::= block-header * { instruction }
        while matches!(self.token(), Some(Token::Value(_) | Token::Keyword(_))) {
            // inst-result ::= Value(v) [":" "ptr"]
            let result = if let Some(Token::Value(_)) = self.token() {
                let val = self.match_value(ctx, "expected result value")?;
                let ty = self.optional_type()?;
                self.match_token(Token::Equal, "expected '=' after instruction result")?;
                Some((val, ty))
            } else {
                None
            };
            self.parse_instruction(result, ctx, block)?;
        }

        Ok(())
    }

    // Parse the list of function parameters.
    //
    // params ::= * "(" [param { "," param }] ")"
    fn parse_func_params(&mut self, ctx: &mut Context) -> ParseResult<()> {
        self.match_token(Token::LPar, "expected '('")?;
        let mut i = 0usize;
        if self.token() != Some(Token::RPar) {
            loop {
                self.parse_function_param(ctx, i.into())?;
                i += 1;

                if !self.optional(Token::Comma) {
                    break;
                }
            }
        }

        self.match_token(Token::RPar, "expected ')'")?;

        Ok(())
    }

    // Parse a single parameter declaration.
    //
    // param ::= * Value(v) [":" "ptr"]
    //
    fn parse_function_param(&mut self, ctx: &mut Context, param: Param) -> ParseResult<()> {
        let loc = self.loc;
        let v = self.match_value(ctx, "function argument must be a value")?;
        let ty = self.optional_type()?.unwrap_or_default();
        ctx.define_value(v, ValueDef::Param(param), ty, loc)
    }

    // Parse an instruction, append it to `block`.
    //
    // instruction ::= [inst-result "="] Opcode(opc) ...
    //
    fn parse_instruction(
        &mut self,
        result: Option<(Value, Option<Type>)>,
        ctx: &mut Context,
        block: Block,
    ) -> ParseResult<()> {
        let loc = self.loc;
        let opcode = self.match_any_keyword("expected instruction opcode")?;
        let (inst_data, num_results) = self.parse_inst_operands(ctx, opcode)?;

        let num_results = match (&inst_data, num_results) {
            (InstructionData::Call { func_ref, args }, _) => {
                let Some(sig) = ctx.function.dfg.signatures.get(*func_ref) else {
                    return err!(loc, "{} is not declared", func_ref);
                };
                if args.len() != usize::from(sig.params) {
                    return err!(
                        loc,
                        "{} expects {} arguments, {} given",
                        func_ref,
                        sig.params,
                        args.len()
                    );
                }
                if sig.returns {
                    Results::One
                } else {
                    Results::None
                }
            }
            (_, num_results) => num_results,
        };

        match (num_results, result) {
            (Results::One, None) => return err!(loc, "'{}' produces a result value", opcode),
            (Results::None, Some(_)) => {
                return err!(loc, "'{}' does not produce a result value", opcode)
            }
            _ => (),
        }

        let default_ty = match inst_data {
            InstructionData::Gep { .. } | InstructionData::Alloca { .. } => Type::Ptr,
            _ => Type::Scalar,
        };
        let inst = ctx.function.dfg.make_inst(inst_data);
        if let Some((val, ty)) = result {
            ctx.define_value(val, ValueDef::Result(inst), ty.unwrap_or(default_ty), loc)?;
        }
        ctx.function.layout.append_inst_to_bb(inst, block);
        Ok(())
    }

    // Parse comma-separated value list.
    //
    // value_list ::= [ value { "," value } ]
    //
    fn parse_value_list(&mut self, ctx: &mut Context) -> ParseResult<Vec<Value>> {
        let mut args = Vec::new();

        if let Ok(v) = self.match_value(ctx, "") {
            args.push(v);
        } else {
            return Ok(args);
        }

        while self.optional(Token::Comma) {
            args.push(self.match_value(ctx, "expected value in argument list")?);
        }

        Ok(args)
    }

    // Parse a parenthesized argument list.
    fn parse_call_args(&mut self, ctx: &mut Context) -> ParseResult<Vec<Value>> {
        self.match_token(Token::LPar, "expected '(' before arguments")?;
        let args = self.parse_value_list(ctx)?;
        self.match_token(Token::RPar, "expected ')' after arguments")?;
        Ok(args)
    }

    fn parse_operand_pair(&mut self, ctx: &mut Context) -> ParseResult<[Value; 2]> {
        let lhs = self.match_value(ctx, "expected SSA value first operand")?;
        self.match_token(Token::Comma, "expected ',' between operands")?;
        let rhs = self.match_value(ctx, "expected SSA value second operand")?;
        Ok([lhs, rhs])
    }

    fn parse_operand_triple(&mut self, ctx: &mut Context) -> ParseResult<[Value; 3]> {
        let [a, b] = self.parse_operand_pair(ctx)?;
        self.match_token(Token::Comma, "expected ',' between operands")?;
        let c = self.match_value(ctx, "expected SSA value third operand")?;
        Ok([a, b, c])
    }

    // access-size ::= [ "size" Integer ]
    fn parse_access_size(&mut self) -> ParseResult<u32> {
        if self.optional(Token::Keyword("size")) {
            self.match_u32("expected access size")
        } else {
            Ok(8)
        }
    }

    // access-flags ::= access-size [ "inbounds" ]
    fn parse_access_flags(&mut self) -> ParseResult<(u32, bool)> {
        let size = self.parse_access_size()?;
        let inbounds = self.optional(Token::Keyword("inbounds"));
        Ok((size, inbounds))
    }

    // Parse the operands following the instruction opcode.
    // This depends on the format of the opcode.
    fn parse_inst_operands(
        &mut self,
        ctx: &mut Context,
        opcode: &str,
    ) -> ParseResult<(InstructionData, Results)> {
        let res = match opcode {
            "load" => {
                let ptr = self.match_value(ctx, "expected address operand")?;
                let (size, inbounds) = self.parse_access_flags()?;
                (InstructionData::Load { ptr, size, inbounds }, Results::One)
            }
            "store" => {
                let [val, ptr] = self.parse_operand_pair(ctx)?;
                let (size, inbounds) = self.parse_access_flags()?;
                (InstructionData::Store { val, ptr, size, inbounds }, Results::None)
            }
            "atomic_rmw" => {
                let name = self.match_any_keyword("expected atomic operation")?;
                let Some(op) = RmwOp::ALL.into_iter().find(|op| op.name() == name) else {
                    return err!(self.loc, "unknown atomic operation '{}'", name);
                };
                let [ptr, val] = self.parse_operand_pair(ctx)?;
                let size = self.parse_access_size()?;
                (InstructionData::AtomicRmw { op, ptr, val, size }, Results::One)
            }
            "cmpxchg" => {
                let [ptr, expected, replacement] = self.parse_operand_triple(ctx)?;
                let size = self.parse_access_size()?;
                (InstructionData::CmpXchg { ptr, expected, replacement, size }, Results::One)
            }
            // br <COND>, <THEN_DST>, <ELSE_DST>
            "br" => {
                let cond = self.match_value(ctx, "expected SSA value control operand")?;
                self.match_token(Token::Comma, "expected ',' between operands")?;
                let then_dst = self.match_block(ctx, "expected branch destination block")?;
                self.match_token(Token::Comma, "expected ',' between operands")?;
                let else_dst = self.match_block(ctx, "expected branch destination block")?;
                (InstructionData::Branch { cond, then_dst, else_dst }, Results::None)
            }
            // switch <COND>, <DEFAULT>, [<VAL>: <DST>, ...]
            "switch" => {
                let cond = self.match_value(ctx, "expected SSA value control operand")?;
                self.match_token(Token::Comma, "expected ',' between operands")?;
                let default = self.match_block(ctx, "expected default destination block")?;
                self.match_token(Token::Comma, "expected ',' between operands")?;
                self.match_token(Token::LBracket, "expected '[' before switch cases")?;
                let mut cases = Vec::new();
                if self.token() != Some(Token::RBracket) {
                    loop {
                        let val = self.match_imm("expected case value")?;
                        self.match_token(Token::Colon, "expected ':' after case value")?;
                        let dst = self.match_block(ctx, "expected case destination block")?;
                        cases.push((val, dst));
                        if !self.optional(Token::Comma) {
                            break;
                        }
                    }
                }
                self.match_token(Token::RBracket, "expected ']' after switch cases")?;
                (InstructionData::Switch { cond, default, cases }, Results::None)
            }
            "jmp" => {
                let destination = self.match_block(ctx, "expected jump destination block")?;
                (InstructionData::Jump { destination }, Results::None)
            }
            "call" => {
                let func_ref = self.match_fn("expected function reference")?;
                let args = self.parse_call_args(ctx)?;
                // the callee signature decides
                (InstructionData::Call { func_ref, args }, Results::Optional)
            }
            "call_indirect" => {
                let callee = self.match_value(ctx, "expected callee")?;
                let args = self.parse_call_args(ctx)?;
                (InstructionData::CallIndirect { callee, args }, Results::Optional)
            }
            "ret" => {
                let val = match self.token() {
                    Some(Token::Value(_)) => Some(self.match_value(ctx, "expected return value")?),
                    _ => None,
                };
                (InstructionData::Ret { val }, Results::None)
            }
            "resume" => {
                let val = self.match_value(ctx, "expected exception value")?;
                (InstructionData::Resume { val }, Results::None)
            }
            "unreachable" => (InstructionData::Unreachable, Results::None),
            "landingpad" => (InstructionData::LandingPad, Results::One),
            "select" => {
                let [cond, then_val, else_val] = self.parse_operand_triple(ctx)?;
                (InstructionData::Select { cond, then_val, else_val }, Results::One)
            }
            "phi" => {
                let mut edges: Vec<(Block, Value)> = Vec::new();
                loop {
                    let (val, block) = self.parse_phi_edge(ctx)?;
                    if edges.iter().any(|(bb, _)| *bb == block) {
                        return err!(self.loc, "duplicate phi edge from {}", block);
                    }
                    edges.push((block, val));
                    if !self.optional(Token::Comma) {
                        break;
                    }
                }
                (PhiNode { edges }.into(), Results::One)
            }
            "freeze" => {
                let arg = self.match_value(ctx, "expected SSA value operand")?;
                (InstructionData::Freeze { arg }, Results::One)
            }
            "gep" => {
                let base = self.match_value(ctx, "expected base pointer")?;
                let mut offsets = Vec::new();
                while self.optional(Token::Comma) {
                    offsets.push(self.match_value(ctx, "expected offset")?);
                }
                (InstructionData::Gep { base, offsets }, Results::One)
            }
            "alloca" => {
                let size = self.match_u32("expected allocation size")?;
                (InstructionData::Alloca { size }, Results::One)
            }
            "extractelement" => {
                let [vector, index] = self.parse_operand_pair(ctx)?;
                (InstructionData::ExtractElement { vector, index }, Results::One)
            }
            "insertelement" => {
                let [vector, elem, index] = self.parse_operand_triple(ctx)?;
                (InstructionData::InsertElement { vector, elem, index }, Results::One)
            }
            "shufflevector" => {
                let args = self.parse_operand_pair(ctx)?;
                (InstructionData::ShuffleVector { args }, Results::One)
            }
            "extractvalue" => {
                let aggregate = self.match_value(ctx, "expected aggregate")?;
                self.match_token(Token::Comma, "expected ',' between operands")?;
                let index = self.match_u32("expected index")?;
                (InstructionData::ExtractValue { aggregate, index }, Results::One)
            }
            "insertvalue" => {
                let [aggregate, elem] = self.parse_operand_pair(ctx)?;
                self.match_token(Token::Comma, "expected ',' between operands")?;
                let index = self.match_u32("expected index")?;
                (InstructionData::InsertValue { aggregate, elem, index }, Results::One)
            }
            "lfence" => {
                let tag = self.match_str("expected fence tag")?;
                (InstructionData::Fence { tag: tag.into() }, Results::None)
            }
            "opaque" => {
                let mnemonic = self.match_str("expected opaque instruction name")?;
                let args = self.parse_call_args(ctx)?;
                (InstructionData::Opaque { mnemonic: mnemonic.into(), args }, Results::Optional)
            }
            _ => {
                if let Some(op) = BinaryOp::ALL.into_iter().find(|op| op.name() == opcode) {
                    let args = self.parse_operand_pair(ctx)?;
                    (InstructionData::Binary { op, args }, Results::One)
                } else if let Some(op) = CmpOp::ALL.into_iter().find(|op| op.name() == opcode) {
                    let args = self.parse_operand_pair(ctx)?;
                    (InstructionData::Compare { op, args }, Results::One)
                } else if let Some(op) = CastOp::ALL.into_iter().find(|op| op.name() == opcode) {
                    let arg = self.match_value(ctx, "expected SSA value operand")?;
                    (InstructionData::Cast { op, arg }, Results::One)
                } else if let Some(op) = UnaryOp::ALL.into_iter().find(|op| op.name() == opcode) {
                    let arg = self.match_value(ctx, "expected SSA value operand")?;
                    (InstructionData::Unary { op, arg }, Results::One)
                } else {
                    return err!(self.loc, "unknown opcode '{}'", opcode);
                }
            }
        };
        Ok(res)
    }

    fn parse_phi_edge(&mut self, ctx: &mut Context) -> ParseResult<(Value, Block)> {
        self.match_token(Token::LBracket, "expected '['")?;
        let val = self.match_value(ctx, "expected phi value")?;
        self.match_token(Token::Comma, "expected ',' between phi value and block")?;
        let block = self.match_block(ctx, "expected phi block")?;
        self.match_token(Token::RBracket, "expected ']' to end phi edge")?;
        Ok((val, block))
    }

    /// Structural checks that can only be done once the whole function is known.
    fn verify_function(&self, func: &Function) -> ParseResult<()> {
        for val in func.dfg.values() {
            if func.dfg.value_def(val) == ValueDef::Invalid {
                return err!(self.loc, "undefined value {}", val);
            }
        }

        if func.layout.entry_block().is_none() {
            return err!(self.loc, "function %{} has no blocks", func.name);
        }

        for block in func.layout.blocks() {
            let terminator = func.layout.last_inst(block).filter(|&inst| func.dfg.insts[inst].is_terminator());
            let Some(terminator) = terminator else {
                return err!(self.loc, "{} does not end with a terminator", block);
            };
            for inst in func.layout.block_insts(block) {
                let data = &func.dfg.insts[inst];
                if inst != terminator && data.is_terminator() {
                    return err!(self.loc, "terminator in the middle of {}", block);
                }
                for succ in data.successors() {
                    if !func.layout.is_block_inserted(succ) {
                        return err!(self.loc, "{} jumps to undefined {}", block, succ);
                    }
                }
                if let InstructionData::PhiNode(node) = data {
                    for (pred, _) in &node.edges {
                        if !func.layout.is_block_inserted(*pred) {
                            return err!(self.loc, "phi in {} refers to undefined {}", block, pred);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
